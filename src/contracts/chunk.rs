//! Chunk contract (§3) — a retrievable fragment of a document, the unit the
//! engine actually searches over.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use super::document::{KnowledgeType, SourceOrigin};
use crate::error::EngineError;

/// Chunks have a lifecycle the engine must respect when filtering — only
/// `Active` chunks are ever returned by [`crate::ports::VectorStorePort`]
/// (§3, §4.3, §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    Active,
    Superseded,
    Archived,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub content: String,
    pub embedding: Vec<f32>,
    pub knowledge_type: KnowledgeType,
    pub source_origin: SourceOrigin,
    pub chunk_index: u32,
    pub status: ChunkStatus,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    /// Validates the two invariants the spec calls out explicitly: content
    /// must be non-empty, and the embedding must be exactly `dimension`
    /// long — both failures are `contract_violation`s (§3, §8 property 2),
    /// never silently truncated or zero-padded.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        document_id: Uuid,
        content: impl Into<String>,
        embedding: Vec<f32>,
        dimension: usize,
        knowledge_type: KnowledgeType,
        source_origin: SourceOrigin,
        chunk_index: u32,
        status: ChunkStatus,
        metadata: HashMap<String, serde_json::Value>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        let content = content.into();
        if content.is_empty() {
            return Err(EngineError::ContractViolation(
                "chunk content must be non-empty".into(),
            ));
        }
        if embedding.len() != dimension {
            return Err(EngineError::ContractViolation(format!(
                "chunk embedding has dimension {} but expected {}",
                embedding.len(),
                dimension
            )));
        }
        Ok(Self {
            id,
            document_id,
            content,
            embedding,
            knowledge_type,
            source_origin,
            chunk_index,
            status,
            metadata,
            created_at,
            updated_at,
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ChunkStatus::Active
    }
}
