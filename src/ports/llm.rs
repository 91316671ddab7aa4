//! LlmPort (§4.10) — chat completion used by the planner's `proceed`
//! branch. Not part of the original contracts list (C1-C12) but specified
//! alongside them in §4.10: "the planner synthesizes a response via an
//! LLM when one is configured, falling back to a deterministic template
//! when it is not, or when the call fails."

use async_trait::async_trait;

use crate::contracts::{ConversationTurn, Role};
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub system_prompt: String,
    pub history: Vec<ConversationTurn>,
    pub user_query: String,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct LlmCompletion {
    pub text: String,
    pub model: String,
}

#[async_trait]
pub trait LlmPort: Send + Sync {
    /// A single non-streaming completion (§1 Non-goals excludes streaming
    /// token output). Failures are reported as `Err` — the planner is the
    /// one that converts that into the errors-as-data `LlmMetadata`
    /// (§4.10), this port itself stays a thin boundary like the teacher's
    /// `llm::provider::Provider` trait.
    async fn complete(&self, request: LlmRequest) -> EngineResult<LlmCompletion>;
}

/// HTTP-backed adapter grounded in the teacher's `llm/provider/mod.rs`
/// (`Message`/`Response` shape) and `gemini_embeddings.rs`'s request
/// pattern: a `reqwest::Client`, API key and base URL captured at
/// construction, one JSON POST per call.
pub struct HttpLlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpLlmClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    fn completion_url(&self) -> String {
        format!("{}/chat/completions?key={}", self.base_url, self.api_key)
    }
}

#[async_trait]
impl LlmPort for HttpLlmClient {
    async fn complete(&self, request: LlmRequest) -> EngineResult<LlmCompletion> {
        use crate::error::EngineError;

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];
        for turn in &request.history {
            messages.push(serde_json::json!({
                "role": role_str(turn.role),
                "content": turn.content,
            }));
        }
        messages.push(serde_json::json!({
            "role": "user",
            "content": format!("Context:\n{}\n\nQuestion: {}", request.context, request.user_query),
        }));

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        let response = self
            .client
            .post(self.completion_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EngineError::UpstreamUnavailable(format!("llm service returned {status}")));
        }

        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        let text = parsed
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| EngineError::UpstreamUnavailable("missing completion text".into()))?
            .to_string();

        Ok(LlmCompletion {
            text,
            model: self.model.clone(),
        })
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

/// Deterministic mock used by tests that need `proceed` to take the LLM
/// path without network access — echoes the context back so assertions
/// can check it was actually passed through.
pub struct MockLlmClient {
    pub model: String,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self { model: "mock-llm".to_string() }
    }
}

#[async_trait]
impl LlmPort for MockLlmClient {
    async fn complete(&self, request: LlmRequest) -> EngineResult<LlmCompletion> {
        Ok(LlmCompletion {
            text: format!("Based on: {}\n\nAnswer to: {}", request.context, request.user_query),
            model: self.model.clone(),
        })
    }
}

/// Always-fails adapter for exercising the LLM-fallback-to-template path
/// (§4.10, §8 property 13).
pub struct FailingLlmClient;

#[async_trait]
impl LlmPort for FailingLlmClient {
    async fn complete(&self, _request: LlmRequest) -> EngineResult<LlmCompletion> {
        Err(crate::error::EngineError::UpstreamUnavailable("llm unavailable in test fixture".into()))
    }
}
