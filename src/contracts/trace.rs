//! RetrievalTrace contract (§3) — one structured event per pipeline step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    RecallBegin,
    ProviderCall,
    Rerank,
    Fallback,
    BranchDecision,
    BranchForced,
    LlmSynthesis,
    TemplateSynthesis,
    RecallEnd,
    SessionNew,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::RecallBegin => "recall_begin",
            TraceKind::ProviderCall => "provider_call",
            TraceKind::Rerank => "rerank",
            TraceKind::Fallback => "fallback",
            TraceKind::BranchDecision => "branch_decision",
            TraceKind::BranchForced => "branch_forced",
            TraceKind::LlmSynthesis => "llm_synthesis",
            TraceKind::TemplateSynthesis => "template_synthesis",
            TraceKind::RecallEnd => "recall_end",
            TraceKind::SessionNew => "session_new",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub id: u64,
    pub trace_id: String,
    pub ts: DateTime<Utc>,
    pub kind: TraceKind,
    pub attrs: HashMap<String, serde_json::Value>,
}
