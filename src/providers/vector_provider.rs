//! VectorProvider (§4.4) — the primary provider: embeds the query, searches
//! a vector store, and turns hits into `Candidate`s. Grounded in the
//! teacher's `RecallEngine` (`memory/features/recall_engine/mod.rs`), which
//! composes an embedding step with a store search the same way.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::contracts::Candidate;
use crate::ports::vector_store::VectorSearchFilter;
use crate::ports::{EmbeddingPort, VectorStorePort};

use super::{MemoryProviderImpl, ProviderOutcome, ProviderQuery};

pub struct VectorProvider {
    embedding: Arc<dyn EmbeddingPort>,
    store: Arc<dyn VectorStorePort>,
    /// T_embed (§5, default 15s) — budgets the embed step on its own
    /// instead of sharing the "vector" provider's overall per-call timeout,
    /// since embedding and store search are independent upstream calls.
    embed_timeout: Duration,
    search_timeout: Duration,
}

impl VectorProvider {
    pub fn new(embedding: Arc<dyn EmbeddingPort>, store: Arc<dyn VectorStorePort>) -> Self {
        Self::with_timeouts(embedding, store, Duration::from_secs(15), Duration::from_secs(10))
    }

    pub fn with_timeouts(
        embedding: Arc<dyn EmbeddingPort>,
        store: Arc<dyn VectorStorePort>,
        embed_timeout: Duration,
        search_timeout: Duration,
    ) -> Self {
        Self { embedding, store, embed_timeout, search_timeout }
    }
}

#[async_trait]
impl MemoryProviderImpl for VectorProvider {
    async fn recall(&self, query: &ProviderQuery) -> ProviderOutcome {
        let vector = match tokio::time::timeout(self.embed_timeout, self.embedding.embed_query(&query.text)).await {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                warn!(error = %e, "vector provider: embedding call failed");
                return ProviderOutcome::failed(self.name(), e.kind(), e.to_string());
            }
            Err(_) => {
                warn!("vector provider: embedding call timed out");
                return ProviderOutcome::failed(self.name(), "timeout", "embedding call timed out");
            }
        };

        let search = match tokio::time::timeout(
            self.search_timeout,
            self.store.similarity_search(&vector, query.top_k, query.threshold, VectorSearchFilter::default()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                warn!("vector provider: store search timed out");
                return ProviderOutcome::failed(self.name(), "timeout", "vector store search timed out");
            }
        };

        match search {
            Ok((hits, raw_count)) => {
                debug!(hits = hits.len(), raw_count, "vector provider: search complete");
                let candidates = hits
                    .into_iter()
                    .map(|hit| {
                        let mut metadata = HashMap::new();
                        metadata.insert("chunk_id".to_string(), hit.chunk_id.into());
                        metadata.insert("document_id".to_string(), hit.document_id.into());
                        metadata.insert(
                            "knowledge_type".to_string(),
                            format!("{:?}", hit.knowledge_type).to_lowercase().into(),
                        );
                        metadata.insert(
                            "source_origin".to_string(),
                            format!("{:?}", hit.source_origin).to_lowercase().into(),
                        );
                        Candidate::new(hit.content, "vector", hit.similarity, metadata)
                    })
                    .collect();
                ProviderOutcome::ok(self.name(), candidates, raw_count)
            }
            Err(e) => {
                warn!(error = %e, "vector provider: store search failed");
                ProviderOutcome::failed(self.name(), e.kind(), e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "vector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{ChunkStatus, KnowledgeType, SourceOrigin};
    use crate::ports::embedding::MockEmbeddingClient;
    use crate::ports::vector_store::InMemoryVectorStore;
    use chrono::Utc;
    use uuid::Uuid;

    fn make_chunk(content: &str, embedding: Vec<f32>) -> crate::contracts::Chunk {
        crate::contracts::Chunk::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            content,
            embedding,
            4,
            KnowledgeType::Note,
            SourceOrigin::Manual,
            0,
            ChunkStatus::Active,
            HashMap::new(),
            Utc::now(),
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn recall_returns_candidates_above_threshold() {
        let embedding: Arc<dyn EmbeddingPort> = Arc::new(MockEmbeddingClient::new(4));
        let chunk_vec = embedding.embed_query("apples are great").await.unwrap();
        let store = Arc::new(InMemoryVectorStore::new(vec![make_chunk("apples are great", chunk_vec)]));
        let provider = VectorProvider::new(embedding, store);

        let outcome = provider
            .recall(&ProviderQuery { text: "apples are great".into(), top_k: 5, threshold: 0.5 })
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.candidates.len(), 1);
        assert_eq!(outcome.candidates[0].source, "vector");
    }

    #[tokio::test]
    async fn recall_reports_error_when_embedding_fails() {
        struct FailingEmbedding;
        #[async_trait]
        impl EmbeddingPort for FailingEmbedding {
            async fn embed_query(&self, _text: &str) -> crate::error::EngineResult<Vec<f32>> {
                Err(crate::error::EngineError::UpstreamUnavailable("down".into()))
            }
            async fn embed_documents(&self, _texts: &[String]) -> crate::error::EngineResult<Vec<Vec<f32>>> {
                Ok(Vec::new())
            }
            fn dimension(&self) -> usize {
                4
            }
        }

        let provider = VectorProvider::new(Arc::new(FailingEmbedding), Arc::new(InMemoryVectorStore::new(vec![])));
        let outcome = provider
            .recall(&ProviderQuery { text: "anything".into(), top_k: 5, threshold: 0.5 })
            .await;

        assert!(outcome.error.is_some());
        assert!(outcome.candidates.is_empty());
    }

    #[tokio::test]
    async fn recall_reports_timeout_when_embedding_exceeds_its_own_budget() {
        struct SlowEmbedding;
        #[async_trait]
        impl EmbeddingPort for SlowEmbedding {
            async fn embed_query(&self, _text: &str) -> crate::error::EngineResult<Vec<f32>> {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Ok(vec![0.0; 4])
            }
            async fn embed_documents(&self, _texts: &[String]) -> crate::error::EngineResult<Vec<Vec<f32>>> {
                Ok(Vec::new())
            }
            fn dimension(&self) -> usize {
                4
            }
        }

        let provider = VectorProvider::with_timeouts(
            Arc::new(SlowEmbedding),
            Arc::new(InMemoryVectorStore::new(vec![])),
            std::time::Duration::from_millis(5),
            std::time::Duration::from_secs(10),
        );
        let outcome = provider
            .recall(&ProviderQuery { text: "anything".into(), top_k: 5, threshold: 0.5 })
            .await;

        assert_eq!(outcome.error_kind, Some("timeout"));
    }
}
