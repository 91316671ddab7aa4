//! PlannerResponse contract (§3) — final output of the engine.

use serde::{Deserialize, Serialize};

use super::context_packet::RoutingMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    Proceed,
    Empty,
    LowConfidence,
    Escalate,
    Error,
}

impl ActionTaken {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTaken::Proceed => "proceed",
            ActionTaken::Empty => "empty",
            ActionTaken::LowConfidence => "low_confidence",
            ActionTaken::Escalate => "escalate",
            ActionTaken::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmMetadata {
    pub used: bool,
    pub fallback: bool,
    pub model: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalMetadata {
    pub routing_metadata: Vec<RoutingMetadata>,
    pub providers_failed: Vec<String>,
    pub llm: Option<LlmMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerResponse {
    pub response_text: String,
    pub action_taken: ActionTaken,
    /// Mirrors `action_taken` for external consumers that key off a string
    /// code rather than the typed enum (§3).
    pub branch_code: String,
    pub session_id: String,
    pub candidates_used: usize,
    pub confidence: f32,
    pub retrieval_metadata: RetrievalMetadata,
}
