//! VectorStorePort (C3, §4.3, §6.2) — similarity search over stored chunks.

use async_trait::async_trait;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};

use crate::contracts::{Chunk, ChunkStatus, KnowledgeType, SourceOrigin};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Default)]
pub struct VectorSearchFilter {
    pub knowledge_type: Option<KnowledgeType>,
    pub source_origin: Option<SourceOrigin>,
}

/// A single similarity hit: chunk content/metadata plus the raw cosine
/// similarity the store computed (mapped to `Candidate.confidence` by the
/// calling provider, §4.3).
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub chunk_id: String,
    pub document_id: String,
    pub content: String,
    pub knowledge_type: KnowledgeType,
    pub source_origin: SourceOrigin,
    pub similarity: f32,
}

#[async_trait]
pub trait VectorStorePort: Send + Sync {
    /// Returns up to `top_k` chunks with similarity `>= threshold`, ordered
    /// descending, plus `raw_count` — the number of hits considered before
    /// truncation (§4.3). `filter.status` is always `active` under the
    /// hood; the engine never sees `superseded`/`archived`/`deleted`.
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        threshold: f32,
        filter: VectorSearchFilter,
    ) -> EngineResult<(Vec<VectorHit>, usize)>;
}

/// Qdrant-backed adapter, grounded in the teacher's
/// `memory/storage/qdrant/multi_store.rs` (`Qdrant::from_url`,
/// `CreateCollectionBuilder`/`VectorParamsBuilder` for idempotent
/// collection setup, `SearchPointsBuilder` + payload filters for search).
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
}

impl QdrantVectorStore {
    pub async fn new(url: &str, collection: &str, dimension: u64) -> EngineResult<Self> {
        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        let store = Self {
            client,
            collection: collection.to_string(),
        };
        store.ensure_collection(dimension).await?;
        Ok(store)
    }

    async fn ensure_collection(&self, dimension: u64) -> EngineResult<()> {
        let exists = self
            .client
            .collection_exists(&self.collection)
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        if !exists {
            info!("creating Qdrant collection {}", self.collection);
            match self
                .client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection)
                        .vectors_config(VectorParamsBuilder::new(dimension, Distance::Cosine)),
                )
                .await
            {
                Ok(_) => {}
                Err(e) if e.to_string().contains("already exists") => {
                    debug!("collection {} created concurrently, ignoring", self.collection);
                }
                Err(e) => return Err(EngineError::StoreUnavailable(e.to_string())),
            }
        }
        Ok(())
    }

    /// Upsert a chunk's embedding and payload — used by the (out-of-scope)
    /// ingestion pipeline driving this store; kept here because it shares
    /// the client/collection and is how the reference deployment's schema
    /// (§6.2) actually gets populated.
    pub async fn upsert_chunk(&self, chunk: &Chunk) -> EngineResult<()> {
        let mut payload = std::collections::HashMap::new();
        payload.insert("document_id".to_string(), chunk.document_id.to_string().into());
        payload.insert("content".to_string(), chunk.content.clone().into());
        payload.insert(
            "knowledge_type".to_string(),
            format!("{:?}", chunk.knowledge_type).to_lowercase().into(),
        );
        payload.insert(
            "source_origin".to_string(),
            format!("{:?}", chunk.source_origin).to_lowercase().into(),
        );
        payload.insert("status".to_string(), status_str(chunk.status).into());

        let point = PointStruct::new(chunk.id.to_string(), chunk.embedding.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true))
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        Ok(())
    }
}

fn status_str(status: ChunkStatus) -> &'static str {
    match status {
        ChunkStatus::Active => "active",
        ChunkStatus::Superseded => "superseded",
        ChunkStatus::Archived => "archived",
        ChunkStatus::Deleted => "deleted",
    }
}

#[async_trait]
impl VectorStorePort for QdrantVectorStore {
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        threshold: f32,
        filter: VectorSearchFilter,
    ) -> EngineResult<(Vec<VectorHit>, usize)> {
        let mut must = vec![Condition::matches("status", "active".to_string())];
        if let Some(kt) = filter.knowledge_type {
            must.push(Condition::matches(
                "knowledge_type",
                format!("{:?}", kt).to_lowercase(),
            ));
        }
        if let Some(so) = filter.source_origin {
            must.push(Condition::matches(
                "source_origin",
                format!("{:?}", so).to_lowercase(),
            ));
        }

        // Qdrant has no "total matches above threshold" API distinct from
        // the hits it hands back, so `raw_count` (§4.3's "hits considered
        // before truncation") has to come from over-fetching: ask for more
        // than `top_k` and count what comes back before truncating to it.
        // This undercounts when the true match count exceeds the
        // over-fetch limit, which is the same approximation the teacher's
        // `multi_store.rs` makes peace with for its own merge counts.
        const OVER_FETCH_FACTOR: u64 = 4;
        let search_limit = (top_k as u64).saturating_mul(OVER_FETCH_FACTOR).max(top_k as u64);

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, query_vector.to_vec(), search_limit)
                    .filter(Filter::must(must))
                    .score_threshold(threshold)
                    .with_payload(true),
            )
            .await
            .map_err(|e| EngineError::StoreUnavailable(e.to_string()))?;

        let raw_count = results.result.len();
        let hits = results
            .result
            .into_iter()
            .filter_map(point_to_hit)
            .take(top_k)
            .collect();

        Ok((hits, raw_count))
    }
}

fn point_to_hit(point: qdrant_client::qdrant::ScoredPoint) -> Option<VectorHit> {
    let payload = &point.payload;
    let chunk_id = match &point.id?.point_id_options? {
        qdrant_client::qdrant::point_id::PointIdOptions::Uuid(u) => u.clone(),
        qdrant_client::qdrant::point_id::PointIdOptions::Num(n) => n.to_string(),
    };
    let document_id = payload.get("document_id")?.as_str()?.to_string();
    let content = payload.get("content")?.as_str()?.to_string();
    let knowledge_type = payload.get("knowledge_type")?.as_str()?.parse().ok()?;
    let source_origin = payload.get("source_origin")?.as_str()?.parse().ok()?;

    Some(VectorHit {
        chunk_id,
        document_id,
        content,
        knowledge_type,
        source_origin,
        similarity: point.score,
    })
}

/// In-memory store for tests: a flat `Vec<(Chunk, ...)>` scanned linearly
/// and scored by cosine similarity — no index, just enough to exercise the
/// port contract deterministically.
pub struct InMemoryVectorStore {
    chunks: parking_lot::RwLock<Vec<Chunk>>,
}

impl InMemoryVectorStore {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks: parking_lot::RwLock::new(chunks),
        }
    }

    pub fn insert(&self, chunk: Chunk) {
        self.chunks.write().push(chunk);
    }
}

#[async_trait]
impl VectorStorePort for InMemoryVectorStore {
    async fn similarity_search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        threshold: f32,
        filter: VectorSearchFilter,
    ) -> EngineResult<(Vec<VectorHit>, usize)> {
        let chunks = self.chunks.read();
        let mut scored: Vec<VectorHit> = chunks
            .iter()
            .filter(|c| c.is_active())
            .filter(|c| filter.knowledge_type.is_none_or(|kt| kt == c.knowledge_type))
            .filter(|c| filter.source_origin.is_none_or(|so| so == c.source_origin))
            .map(|c| VectorHit {
                chunk_id: c.id.to_string(),
                document_id: c.document_id.to_string(),
                content: c.content.clone(),
                knowledge_type: c.knowledge_type,
                source_origin: c.source_origin,
                similarity: cosine_similarity(&c.embedding, query_vector),
            })
            .filter(|hit| hit.similarity >= threshold)
            .collect();

        scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap());
        let raw_count = scored.len();
        scored.truncate(top_k);

        Ok((scored, raw_count))
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}
