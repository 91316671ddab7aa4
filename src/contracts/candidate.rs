//! Candidate contract (§3) — a single retrieval result surfaced to the
//! planner. Constructed per query, never persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub content: String,
    pub source: String,
    pub confidence: f32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Candidate {
    /// `confidence` is clamped to `[0, 1]` and `source` defaults to
    /// `"unknown"` rather than being allowed empty — the spec's invariant
    /// is "never empty", and a provider bug that forgets to set it should
    /// not panic the merge step in the orchestrator.
    pub fn new(
        content: impl Into<String>,
        source: impl Into<String>,
        confidence: f32,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Self {
        let source = source.into();
        Self {
            content: content.into(),
            source: if source.is_empty() {
                "unknown".to_string()
            } else {
                source
            },
            confidence: confidence.clamp(0.0, 1.0),
            metadata,
        }
    }

    pub fn chunk_id(&self) -> Option<String> {
        self.metadata
            .get("chunk_id")
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    pub fn document_id(&self) -> Option<String> {
        self.metadata
            .get("document_id")
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    /// A stable key for deduplication when no chunk id is present: the
    /// content hash (§4.8 step 4).
    pub fn dedup_key(&self) -> String {
        use sha2::{Digest, Sha256};
        match self.chunk_id() {
            Some(id) => id,
            None => {
                let mut hasher = Sha256::new();
                hasher.update(self.content.as_bytes());
                format!("content:{:x}", hasher.finalize())
            }
        }
    }
}
