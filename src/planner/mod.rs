//! Planner (C10, §4.10) — owns conversation state, runs the branch state
//! machine against a `ContextPacket`, and formats the final
//! `PlannerResponse`. Grounded in the teacher's `llm_orchestrator.rs`
//! (`operations/engine/llm_orchestrator.rs`), which plays an identical
//! role composing retrieval output with an LLM call and a deterministic
//! fallback.

mod sanitize;
mod template;

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::branch_policy::BranchPolicy;
use crate::config::{Config, Mode};
use crate::contracts::{
    ActionTaken, Candidate, ContextPacket, LlmMetadata, PlannerResponse, Role, RetrievalMetadata,
    TraceKind,
};
use crate::conversation_store::ConversationStore;
use crate::error::{EngineError, EngineResult};
use crate::orchestrator::RecallOrchestrator;
use crate::ports::llm::LlmRequest;
use crate::ports::LlmPort;
use crate::router::ProviderRegistry;
use crate::trace_collector::TraceCollector;

const SYSTEM_PROMPT: &str = "You are a personal-knowledge assistant. Answer the user's \
question using *only* the provided context. Name the source candidate where you can. If \
the context is insufficient to answer confidently, say so instead of guessing.";

/// Parameters for a single `chat` call — mirrors §6.1's `chat` signature.
pub struct ChatRequest<'a> {
    pub query: &'a str,
    pub session_id: Option<&'a str>,
    pub mode: Mode,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    /// Test-only escape hatch into `BranchPolicy::classify`'s forced path
    /// (§4.9).
    pub force_branch: Option<ActionTaken>,
}

pub struct Planner {
    orchestrator: RecallOrchestrator,
    conversation: Arc<ConversationStore>,
    trace: Arc<TraceCollector>,
    llm: Option<Arc<dyn LlmPort>>,
    config: Arc<Config>,
}

impl Planner {
    pub fn new(
        orchestrator: RecallOrchestrator,
        conversation: Arc<ConversationStore>,
        trace: Arc<TraceCollector>,
        llm: Option<Arc<dyn LlmPort>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            orchestrator,
            conversation,
            trace,
            llm,
            config,
        }
    }

    /// Drives one `chat` turn end to end (§4.10's algorithm, steps 1-6).
    pub async fn chat(&self, request: ChatRequest<'_>, registry: &ProviderRegistry) -> EngineResult<PlannerResponse> {
        let request_deadline = Instant::now() + self.config.timeouts.request_deadline(request.mode);

        // Step 1: resolve session. An unknown or absent session id is
        // silently replaced with a fresh one (§4.10's session-ownership
        // rule, §8 property 8) — never reused, never echoed back verbatim.
        let is_known = request
            .session_id
            .map(|id| self.conversation.has_session(id))
            .unwrap_or(false);
        let lookup_id = if is_known { request.session_id } else { None };
        let (session_id, _) = self.conversation.get_or_create(lookup_id);

        if !is_known {
            self.trace.record(
                session_id.clone(),
                TraceKind::SessionNew,
                attrs([("requested", request.session_id.map(Into::into).unwrap_or(serde_json::Value::Null))]),
            );
        }

        // Hold this session's turn lock for the rest of the call so a
        // concurrent `chat` on the same session can't insert its own user
        // turn between this call's user and assistant turns (§5, §8
        // property 9). Different sessions never contend on this lock.
        let turn_lock = self.conversation.turn_lock(&session_id);
        let _turn_guard = turn_lock.lock().await;

        self.conversation.append(&session_id, Role::User, request.query);

        // Step 2: retrieval.
        let packet = self
            .orchestrator
            .recall(
                request.query,
                request.mode,
                registry,
                request_deadline,
                request.top_k,
                request.threshold,
            )
            .await;

        // Step 3: branch classification. A forced branch (test-only escape
        // hatch, §4.9) is traced as `branch_forced` rather than the normal
        // `branch_decision` kind, so a trace reader can tell the two apart.
        let branch = BranchPolicy::classify(&packet, request.mode, &self.config.thresholds, request.force_branch);
        let branch_trace_kind = if request.force_branch.is_some() {
            TraceKind::BranchForced
        } else {
            TraceKind::BranchDecision
        };
        self.trace.record(
            packet.trace_id.clone(),
            branch_trace_kind,
            attrs([("branch", branch.as_str().into())]),
        );
        metrics::counter!("planner_branch_outcomes_total", "branch" => branch.as_str()).increment(1);

        // Step 4: per-branch response synthesis.
        let (response_text, llm_metadata) = match branch {
            ActionTaken::Proceed => self.synthesize_proceed(request.query, &packet).await,
            ActionTaken::LowConfidence => (
                template::render_low_confidence(&packet.candidates, packet.summary.top_confidence),
                None,
            ),
            ActionTaken::Empty => (template::render_empty(), None),
            ActionTaken::Error => {
                let failed: Vec<template::FailedProvider> = packet
                    .routing_metadata
                    .iter()
                    .filter(|m| m.error.is_some())
                    .map(|m| template::FailedProvider {
                        provider: m.provider.clone(),
                        error_kind: m.error_kind.clone().unwrap_or_else(|| "internal_error".to_string()),
                    })
                    .collect();
                (sanitize::sanitize(&template::render_error(&failed)), None)
            }
            ActionTaken::Escalate => (template::render_escalate(), None),
        };

        // Step 5: append assistant turn.
        let state = self.conversation.append(&session_id, Role::Assistant, &response_text);
        debug!(session_id = %session_id, turns = state.turns.len(), branch = branch.as_str(), "chat turn recorded");

        // Step 6: build the response.
        let candidates_used = match branch {
            ActionTaken::Proceed => packet.candidates.len().min(3),
            _ => 0,
        };

        Ok(PlannerResponse {
            response_text,
            action_taken: branch,
            branch_code: branch.as_str().to_string(),
            session_id,
            candidates_used,
            confidence: packet.summary.top_confidence,
            retrieval_metadata: RetrievalMetadata {
                routing_metadata: packet.routing_metadata,
                providers_failed: packet.summary.providers_failed,
                llm: llm_metadata,
            },
        })
    }

    /// `recall_search` (§6.1) — the bare retrieval operation with no
    /// planning or synthesis layered on top, for callers that only need
    /// the `ContextPacket`.
    pub async fn recall_search(
        &self,
        query: &str,
        mode: Mode,
        registry: &ProviderRegistry,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> ContextPacket {
        let deadline = Instant::now() + self.config.timeouts.request_deadline(mode);
        self.orchestrator.recall(query, mode, registry, deadline, top_k, threshold).await
    }

    async fn synthesize_proceed(&self, query: &str, packet: &ContextPacket) -> (String, Option<LlmMetadata>) {
        let top_candidates: Vec<Candidate> = packet.candidates.iter().take(3).cloned().collect();

        let Some(llm) = self.llm.clone().filter(|_| self.config.llm_enabled) else {
            self.trace.record(packet.trace_id.clone(), TraceKind::TemplateSynthesis, attrs([]));
            return (
                template::render_proceed(&top_candidates, packet.summary.top_confidence),
                Some(LlmMetadata { used: false, fallback: false, model: None, error: None }),
            );
        };

        let context = top_candidates
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[{}] ({}) {}", i + 1, c.source, c.content))
            .collect::<Vec<_>>()
            .join("\n\n");

        let llm_request = LlmRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            history: Vec::new(),
            user_query: query.to_string(),
            context,
        };

        match tokio::time::timeout(self.config.timeouts.llm, llm.complete(llm_request)).await {
            Ok(Ok(completion)) => {
                self.trace.record(
                    packet.trace_id.clone(),
                    TraceKind::LlmSynthesis,
                    attrs([("model", completion.model.clone().into())]),
                );
                (
                    completion.text,
                    Some(LlmMetadata { used: true, fallback: false, model: Some(completion.model), error: None }),
                )
            }
            Ok(Err(e)) => self.fallback_to_template(&top_candidates, packet, Some(e)),
            Err(_) => self.fallback_to_template(&top_candidates, packet, Some(EngineError::Timeout("llm".into()))),
        }
    }

    /// On any LLM failure — call error or timeout — the planner falls
    /// back to the deterministic template and never surfaces the upstream
    /// error as a user-facing failure (§4.10, §8 property 13): it only
    /// ever shows up in `retrieval_metadata.llm`.
    fn fallback_to_template(
        &self,
        candidates: &[Candidate],
        packet: &ContextPacket,
        error: Option<EngineError>,
    ) -> (String, Option<LlmMetadata>) {
        if let Some(e) = &error {
            warn!(trace_id = %packet.trace_id, error = %e, "llm synthesis failed, falling back to template");
        }
        self.trace.record(packet.trace_id.clone(), TraceKind::TemplateSynthesis, attrs([("fallback", true.into())]));
        (
            template::render_proceed(candidates, packet.summary.top_confidence),
            Some(LlmMetadata {
                used: false,
                fallback: true,
                model: None,
                error: error.map(|e| e.kind().to_string()),
            }),
        )
    }
}

fn attrs<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> std::collections::HashMap<String, serde_json::Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::ports::llm::{FailingLlmClient, MockLlmClient};
    use crate::ports::rerank::MockReranker;
    use crate::providers::{MemoryProvider, MockEntry, MockProvider, ProviderStatusMap};
    use crate::router::NamedProvider;
    use std::collections::HashMap;
    use std::time::Duration;

    fn mock_registry(entries: Vec<MockEntry>) -> ProviderRegistry {
        ProviderRegistry {
            mock: Some(NamedProvider {
                name: "mock",
                provider: Arc::new(MemoryProvider::Mock(MockProvider::new(entries))),
            }),
            ..Default::default()
        }
    }

    fn planner(config: Arc<Config>, llm: Option<Arc<dyn LlmPort>>) -> Planner {
        let trace = Arc::new(TraceCollector::new(config.trace.max_events));
        let status = Arc::new(ProviderStatusMap::new(Duration::from_secs(config.provider_status.cooldown_seconds)));
        let orchestrator = RecallOrchestrator::new(status, Some(Arc::new(MockReranker::default())), trace.clone(), config.clone());
        let conversation = Arc::new(ConversationStore::new(config.conversation.max_turns, config.conversation.max_sessions).unwrap());
        Planner::new(orchestrator, conversation, trace, llm, config)
    }

    #[tokio::test]
    async fn s1_happy_path_proceed() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![
            MockEntry { content: "notes about RAG architecture".into(), metadata: HashMap::new() },
            MockEntry { content: "RAG evaluation metrics".into(), metadata: HashMap::new() },
            MockEntry { content: "RAG pipeline retries".into(), metadata: HashMap::new() },
        ]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "what did I write about RAG?",
                    session_id: None,
                    mode: Mode::Conversation,
                    top_k: Some(5),
                    threshold: Some(0.1),
                    force_branch: None,
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(response.action_taken, ActionTaken::Proceed);
        assert!(response.response_text.to_lowercase().contains("rag"));
    }

    #[tokio::test]
    async fn s2_empty_corpus() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "anything at all",
                    session_id: None,
                    mode: Mode::Fast,
                    top_k: None,
                    threshold: None,
                    force_branch: None,
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(response.action_taken, ActionTaken::Empty);
        assert_eq!(response.candidates_used, 0);
    }

    #[tokio::test]
    async fn s4_low_confidence() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![MockEntry {
            content: "partially related note about gardening".into(),
            metadata: HashMap::new(),
        }]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "gardening tips only half matching note",
                    session_id: None,
                    mode: Mode::Fast,
                    top_k: None,
                    threshold: Some(0.01),
                    force_branch: Some(ActionTaken::LowConfidence),
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(response.action_taken, ActionTaken::LowConfidence);
        assert!(response.response_text.to_lowercase().contains("low"));
    }

    #[tokio::test]
    async fn s5_session_continuation() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![]);

        let first = planner
            .chat(
                ChatRequest { query: "foo", session_id: None, mode: Mode::Fast, top_k: None, threshold: None, force_branch: None },
                &registry,
            )
            .await
            .unwrap();

        let second = planner
            .chat(
                ChatRequest {
                    query: "bar",
                    session_id: Some(&first.session_id),
                    mode: Mode::Fast,
                    top_k: None,
                    threshold: None,
                    force_branch: None,
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(first.session_id, second.session_id);
        let (_, snapshot) = planner.conversation.get_or_create(Some(&first.session_id));
        assert_eq!(snapshot.turns.len(), 4);
        assert_eq!(snapshot.turns[0].content, "foo");
        assert_eq!(snapshot.turns[2].content, "bar");
    }

    #[tokio::test]
    async fn unknown_session_id_is_replaced() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "hello",
                    session_id: Some("guessed-session-id"),
                    mode: Mode::Fast,
                    top_k: None,
                    threshold: None,
                    force_branch: None,
                },
                &registry,
            )
            .await
            .unwrap();

        assert_ne!(response.session_id, "guessed-session-id");
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_template() {
        let mut config = Config::default();
        config.llm_enabled = true;
        let planner = planner(Arc::new(config), Some(Arc::new(FailingLlmClient)));
        let registry = mock_registry(vec![MockEntry { content: "a well matched note".into(), metadata: HashMap::new() }]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "well matched note",
                    session_id: None,
                    mode: Mode::Conversation,
                    top_k: None,
                    threshold: Some(0.1),
                    force_branch: Some(ActionTaken::Proceed),
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(response.action_taken, ActionTaken::Proceed);
        let llm = response.retrieval_metadata.llm.unwrap();
        assert!(llm.fallback);
    }

    #[tokio::test]
    async fn llm_success_is_used_verbatim() {
        let mut config = Config::default();
        config.llm_enabled = true;
        let planner = planner(Arc::new(config), Some(Arc::new(MockLlmClient::default())));
        let registry = mock_registry(vec![MockEntry { content: "a well matched note".into(), metadata: HashMap::new() }]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "well matched note",
                    session_id: None,
                    mode: Mode::Conversation,
                    top_k: None,
                    threshold: Some(0.1),
                    force_branch: Some(ActionTaken::Proceed),
                },
                &registry,
            )
            .await
            .unwrap();

        assert!(response.response_text.starts_with("Based on:"));
        let llm = response.retrieval_metadata.llm.unwrap();
        assert!(llm.used);
        assert!(!llm.fallback);
    }

    #[tokio::test]
    async fn error_branch_never_leaks_raw_text() {
        let config = Arc::new(Config::default());
        let planner = planner(config, None);
        let registry = mock_registry(vec![]);

        let response = planner
            .chat(
                ChatRequest {
                    query: "anything",
                    session_id: None,
                    mode: Mode::Fast,
                    top_k: None,
                    threshold: None,
                    force_branch: Some(ActionTaken::Error),
                },
                &registry,
            )
            .await
            .unwrap();

        assert_eq!(response.action_taken, ActionTaken::Error);
        assert!(!response.response_text.contains("api_key="));
    }
}
