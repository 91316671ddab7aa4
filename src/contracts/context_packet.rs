//! ContextPacket contract (§3) — the orchestrator's output to the planner.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::Candidate;
use crate::ports::rerank::RerankMetadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSummary {
    pub top_confidence: f32,
    pub candidate_count: usize,
    pub providers_used: Vec<String>,
    pub providers_failed: Vec<String>,
}

/// Provenance per provider attempted — present whether the provider
/// succeeded or failed (§3's ContextPacket invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingMetadata {
    pub provider: String,
    pub raw_hit_count: usize,
    pub rerank_applied: bool,
    pub fallback_reason: Option<String>,
    pub latency_ms: u64,
    pub error: Option<String>,
    /// The stable error-kind tag behind `error` (§7's error taxonomy) —
    /// what the planner's error branch is allowed to render, since `error`
    /// itself may carry upstream prose the sanitizer would otherwise have
    /// to scrub.
    pub error_kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextPacket {
    pub candidates: Vec<Candidate>,
    pub summary: ContextSummary,
    pub routing_metadata: Vec<RoutingMetadata>,
    pub trace_id: String,
    pub created_at: DateTime<Utc>,
    /// Set by the orchestrator when every provider timed out under a mode
    /// that still expects a degraded-but-well-formed packet (§4.8).
    pub branch_hint: Option<String>,
    /// True once the fallback emitter has produced the packet's sole
    /// candidate (or decided hard-empty is acceptable) — §4.7.
    pub fallback_emitted: bool,
    /// The rerank pass's own metadata (§4.5's `rerank_metadata` return
    /// value), `None` when no rerank was attempted this call.
    pub rerank_metadata: Option<RerankMetadata>,
}

impl ContextPacket {
    /// Builds the packet from already-ordered candidates, enforcing the
    /// ordering invariant (§3, §8 property 3): `summary.top_confidence`
    /// mirrors `candidates[0].confidence`, or `0.0` when empty.
    pub fn new(
        candidates: Vec<Candidate>,
        providers_used: Vec<String>,
        providers_failed: Vec<String>,
        routing_metadata: Vec<RoutingMetadata>,
        trace_id: String,
        created_at: DateTime<Utc>,
        branch_hint: Option<String>,
        fallback_emitted: bool,
        rerank_metadata: Option<RerankMetadata>,
    ) -> Self {
        let top_confidence = candidates.first().map(|c| c.confidence).unwrap_or(0.0);
        let summary = ContextSummary {
            top_confidence,
            candidate_count: candidates.len(),
            providers_used,
            providers_failed,
        };
        Self {
            candidates,
            summary,
            routing_metadata,
            trace_id,
            created_at,
            branch_hint,
            fallback_emitted,
            rerank_metadata,
        }
    }
}
