//! Shared fixtures for the integration test suite, mirroring the teacher's
//! `tests/common` helper-module convention.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secondbrain_engine::config::Config;
use secondbrain_engine::conversation_store::ConversationStore;
use secondbrain_engine::error::{EngineError, EngineResult};
use secondbrain_engine::orchestrator::RecallOrchestrator;
use secondbrain_engine::planner::Planner;
use secondbrain_engine::ports::embedding::MockEmbeddingClient;
use secondbrain_engine::ports::rerank::MockReranker;
use secondbrain_engine::ports::vector_store::{VectorHit, VectorSearchFilter};
use secondbrain_engine::ports::{EmbeddingPort, VectorStorePort};
use secondbrain_engine::providers::{MemoryProvider, ProviderStatusMap, VectorProvider};
use secondbrain_engine::router::{NamedProvider, ProviderRegistry};
use secondbrain_engine::trace_collector::TraceCollector;

/// An `EmbeddingPort` that always fails — used to drive a `VectorProvider`
/// into `provider_unavailable` without any network access.
pub struct FailingEmbedding;

#[async_trait]
impl EmbeddingPort for FailingEmbedding {
    async fn embed_query(&self, _text: &str) -> EngineResult<Vec<f32>> {
        Err(EngineError::UpstreamUnavailable("embedding backend down".into()))
    }

    async fn embed_documents(&self, _texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        Err(EngineError::UpstreamUnavailable("embedding backend down".into()))
    }

    fn dimension(&self) -> usize {
        4
    }
}

/// A `VectorStorePort` that sleeps past any reasonable per-request
/// deadline before returning — used to exercise the deadline/timeout path
/// (S6) without a real slow dependency.
pub struct SleepyVectorStore {
    pub delay: Duration,
}

#[async_trait]
impl VectorStorePort for SleepyVectorStore {
    async fn similarity_search(
        &self,
        _query_vector: &[f32],
        _top_k: usize,
        _threshold: f32,
        _filter: VectorSearchFilter,
    ) -> EngineResult<(Vec<VectorHit>, usize)> {
        tokio::time::sleep(self.delay).await;
        Ok((Vec::new(), 0))
    }
}

/// A fully-wired `Planner` over a fresh in-memory `Config`, for tests that
/// don't need to override timeouts/thresholds.
pub fn planner_with(config: Arc<Config>) -> Planner {
    planner_with_store(config).0
}

/// Same as [`planner_with`], but also hands back the `ConversationStore` so
/// a test can inspect turn ordering directly.
pub fn planner_with_store(config: Arc<Config>) -> (Planner, Arc<ConversationStore>) {
    let trace = Arc::new(TraceCollector::new(config.trace.max_events));
    let status = Arc::new(ProviderStatusMap::new(Duration::from_secs(config.provider_status.cooldown_seconds)));
    let orchestrator = RecallOrchestrator::new(status, Some(Arc::new(MockReranker::default())), trace.clone(), config.clone());
    let conversation = Arc::new(ConversationStore::new(config.conversation.max_turns, config.conversation.max_sessions).unwrap());
    (Planner::new(orchestrator, conversation.clone(), trace, None, config), conversation)
}

pub fn registry_with_failing_vector() -> ProviderRegistry {
    let embedding: Arc<dyn EmbeddingPort> = Arc::new(FailingEmbedding);
    let store = Arc::new(secondbrain_engine::ports::vector_store::InMemoryVectorStore::new(Vec::new()));
    ProviderRegistry {
        vector: Some(NamedProvider {
            name: "vector",
            provider: Arc::new(MemoryProvider::Vector(VectorProvider::new(embedding, store))), // default 15s/10s timeouts
        }),
        external_memory: Some(NamedProvider {
            name: "external_memory",
            provider: Arc::new(MemoryProvider::ExternalMemory(secondbrain_engine::providers::ExternalMemoryProvider::new(
                "http://localhost:0".to_string(),
                None,
            ))),
        }),
        ..Default::default()
    }
}

pub fn registry_with_sleepy_vector(delay: Duration) -> ProviderRegistry {
    let embedding: Arc<dyn EmbeddingPort> = Arc::new(MockEmbeddingClient::new(4));
    let store = Arc::new(SleepyVectorStore { delay });
    ProviderRegistry {
        vector: Some(NamedProvider {
            name: "vector",
            provider: Arc::new(MemoryProvider::Vector(VectorProvider::new(embedding, store))),
        }),
        ..Default::default()
    }
}
