//! ExternalMemoryProvider (§4.4) — delegates to a remote memory service
//! over HTTP. Grounded in the teacher's `QdrantMultiStore::search_all`
//! pattern of tolerating a single failed call without losing whatever
//! results came back first (`memory/storage/qdrant/multi_store.rs`).

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::warn;

use crate::contracts::Candidate;
use crate::error::EngineError;

use super::{MemoryProviderImpl, ProviderOutcome, ProviderQuery};

/// A single hit as the external memory service's wire format represents
/// it — decoupled from `Candidate` so a vendor response shape never leaks
/// past this provider.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ExternalMemoryHit {
    pub text: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ExternalMemoryResponse {
    results: Vec<ExternalMemoryHit>,
    #[serde(default)]
    partial: bool,
    #[serde(default)]
    warning: Option<String>,
}

pub struct ExternalMemoryProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExternalMemoryProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    async fn query_remote(&self, query: &ProviderQuery) -> Result<ExternalMemoryResponse, EngineError> {
        let mut request = self.client.post(format!("{}/recall", self.base_url)).json(&serde_json::json!({
            "query": query.text,
            "top_k": query.top_k,
            "threshold": query.threshold,
        }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        } else {
            return Err(EngineError::CredentialsMissing(
                "external memory service api key not configured".into(),
            ));
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EngineError::UpstreamUnavailable(format!(
                "external memory service returned {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))
    }
}

#[async_trait]
impl MemoryProviderImpl for ExternalMemoryProvider {
    async fn recall(&self, query: &ProviderQuery) -> ProviderOutcome {
        match self.query_remote(query).await {
            Ok(response) => {
                let raw_count = response.results.len();
                let candidates: Vec<Candidate> = response
                    .results
                    .into_iter()
                    .map(|hit| Candidate::new(hit.text, "external_memory", hit.score, hit.metadata))
                    .collect();

                // Open Question #1 (recorded in DESIGN.md): a partial
                // response still yields its candidates, with the vendor's
                // own warning surfaced as the outcome's error so routing
                // metadata captures it without discarding what was found.
                if response.partial {
                    let reason = response.warning.unwrap_or_else(|| "partial response".to_string());
                    warn!(reason = %reason, "external memory provider: partial result set");
                    ProviderOutcome::partial(self.name(), candidates, raw_count, "partial_result", reason)
                } else {
                    ProviderOutcome::ok(self.name(), candidates, raw_count)
                }
            }
            Err(e) => {
                warn!(error = %e, "external memory provider: call failed");
                ProviderOutcome::failed(self.name(), e.kind(), e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "external_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recall_reports_credentials_missing_without_api_key() {
        let provider = ExternalMemoryProvider::new("http://localhost:0".into(), None);
        let outcome = provider
            .recall(&ProviderQuery { text: "test".into(), top_k: 5, threshold: 0.5 })
            .await;
        assert_eq!(outcome.error.as_deref(), Some("credentials missing: external memory service api key not configured"));
        assert!(outcome.candidates.is_empty());
    }
}
