//! RerankPort (C5, §4.5) — reorders candidates given the original query.

use async_trait::async_trait;
use std::time::Instant;
use tracing::warn;

use crate::contracts::Candidate;
use crate::error::EngineResult;

/// Which reranker actually produced a `RerankMetadata` (§4.5's
/// `rerank_type ∈ {external, mock, none}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerankType {
    External,
    Mock,
    None,
}

/// The `rerank_metadata` spec.md:134-139 defines as half of `RerankPort`'s
/// return value — distinct from (and finer-grained than) the orchestrator's
/// own `RoutingMetadata.rerank_applied` bool, which only says whether
/// *some* rerank pass touched a given provider's candidates.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RerankMetadata {
    pub rerank_type: RerankType,
    pub model: Option<String>,
    pub latency_ms: u64,
    pub fallback_reason: Option<String>,
}

#[async_trait]
pub trait RerankPort: Send + Sync {
    /// Reorders `candidates` by relevance to `query`, returning at most
    /// `top_k` of them (§4.5: "a permutation of the input, or a proper
    /// subset of size `top_k`") alongside the rerank metadata the caller
    /// threads into the `ContextPacket`. Implementations must never drop a
    /// candidate that still fits within `top_k` except via this explicit
    /// truncation (§8 property 14) — callers treat a surprise length
    /// mismatch beyond that as a contract violation, not a panic.
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> EngineResult<(Vec<Candidate>, RerankMetadata)>;
}

/// Deterministic mock reranker shaped like the teacher's `CompositeScorer`
/// (`memory/features/recall_engine/scoring/composite_scorer.rs`) — a pure
/// per-candidate scoring function blended by a fixed weight — but over
/// keyword overlap against `query` and the candidate's existing confidence,
/// not `CompositeScorer`'s own recency/similarity/salience/project signals
/// (spec.md §4.5 pins the mock reranker's formula to term overlap, not the
/// teacher's blend). Hardened against
/// the two failure modes §8 property 14 calls out: it never drops or
/// duplicates candidates, and a candidate whose score computation yields a
/// non-finite value is treated as the lowest possible score instead of
/// propagating NaN into the sort.
pub struct MockReranker {
    /// Weight given to keyword overlap vs. the candidate's prior
    /// confidence; mirrors the teacher's weighted-sum scoring shape.
    pub overlap_weight: f32,
}

impl Default for MockReranker {
    fn default() -> Self {
        Self { overlap_weight: 0.5 }
    }
}

impl MockReranker {
    pub fn new(overlap_weight: f32) -> Self {
        Self { overlap_weight: overlap_weight.clamp(0.0, 1.0) }
    }

    fn score(&self, query_terms: &[String], candidate: &Candidate) -> f32 {
        let overlap = keyword_overlap(query_terms, &candidate.content);
        let blended = self.overlap_weight * overlap + (1.0 - self.overlap_weight) * candidate.confidence;
        if blended.is_finite() {
            blended.clamp(0.0, 1.0)
        } else {
            warn!("mock reranker produced a non-finite score, treating as 0.0");
            0.0
        }
    }
}

#[async_trait]
impl RerankPort for MockReranker {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> EngineResult<(Vec<Candidate>, RerankMetadata)> {
        let start = Instant::now();
        let query_terms: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        let mut scored: Vec<(f32, Candidate)> = candidates
            .into_iter()
            .map(|c| (self.score(&query_terms, &c), c))
            .collect();

        // Stable sort descending by score; ties keep original order so
        // reranking is deterministic across repeated calls (§8 property 3).
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut reranked: Vec<Candidate> = scored.into_iter().map(|(_, c)| c).collect();
        reranked.truncate(top_k);

        let metadata = RerankMetadata {
            rerank_type: RerankType::Mock,
            model: None,
            latency_ms: start.elapsed().as_millis() as u64,
            fallback_reason: None,
        };
        Ok((reranked, metadata))
    }
}

fn keyword_overlap(query_terms: &[String], content: &str) -> f32 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let content_lower = content.to_lowercase();
    let hits = query_terms.iter().filter(|t| content_lower.contains(t.as_str())).count();
    hits as f32 / query_terms.len() as f32
}

/// A single reordered hit as a cross-encoder-style rerank API returns it:
/// an index into the original candidate list plus a relevance score, the
/// wire shape most vendor rerankers actually use (unlike the mock, which
/// works directly on `Candidate`s).
#[derive(Debug, Clone, serde::Deserialize)]
struct RerankHit {
    index: i64,
    score: Option<f32>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct RerankResponse {
    results: Vec<RerankHit>,
}

/// HTTP-backed adapter grounded in the teacher's HTTP client shape
/// (`HttpEmbeddingClient`, `HttpLlmClient`). Implements §4.5's hardening
/// rule directly: the vendor API returns `(index, score)` pairs, and an
/// out-of-range `index` or a missing/non-finite `score` must never panic
/// the merge step — invalid indices are skipped, invalid scores become
/// `0.0`.
pub struct HttpRerankClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl HttpRerankClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    fn rerank_url(&self) -> String {
        format!("{}/rerank?model={}&key={}", self.base_url, self.model, self.api_key)
    }
}

#[async_trait]
impl RerankPort for HttpRerankClient {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<Candidate>,
        top_k: usize,
    ) -> EngineResult<(Vec<Candidate>, RerankMetadata)> {
        use crate::error::EngineError;

        let start = Instant::now();

        if candidates.is_empty() {
            let metadata = RerankMetadata {
                rerank_type: RerankType::External,
                model: Some(self.model.clone()),
                latency_ms: start.elapsed().as_millis() as u64,
                fallback_reason: None,
            };
            return Ok((candidates, metadata));
        }

        let documents: Vec<&str> = candidates.iter().map(|c| c.content.as_str()).collect();
        let body = serde_json::json!({ "query": query, "documents": documents });

        let response = self
            .client
            .post(self.rerank_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(EngineError::UpstreamUnavailable(format!("rerank service returned {status}")));
        }

        let parsed: RerankResponse = response
            .json()
            .await
            .map_err(|e| EngineError::UpstreamUnavailable(e.to_string()))?;

        let mut reranked = apply_rerank_hits(candidates, parsed.results);
        reranked.truncate(top_k);

        let metadata = RerankMetadata {
            rerank_type: RerankType::External,
            model: Some(self.model.clone()),
            latency_ms: start.elapsed().as_millis() as u64,
            fallback_reason: None,
        };
        Ok((reranked, metadata))
    }
}

/// Bounds-checks each returned index against the original list and skips
/// it rather than panicking or indexing out of bounds; a missing or
/// non-finite score is treated as `0.0` (§4.5's hardening rule, §8
/// property 14). Candidates the vendor response never mentioned are
/// appended at the end in their original relative order, so the output is
/// always the same length as the input.
fn apply_rerank_hits(candidates: Vec<Candidate>, hits: Vec<RerankHit>) -> Vec<Candidate> {
    let mut slots: Vec<Option<Candidate>> = candidates.into_iter().map(Some).collect();
    let mut reordered = Vec::with_capacity(slots.len());

    for hit in hits {
        let Ok(idx) = usize::try_from(hit.index) else {
            warn!(index = hit.index, "rerank hit index out of range, skipping");
            continue;
        };
        if idx >= slots.len() {
            warn!(index = idx, "rerank hit index out of range, skipping");
            continue;
        }
        if let Some(mut candidate) = slots[idx].take() {
            let score = hit.score.filter(|s| s.is_finite()).unwrap_or(0.0);
            candidate.confidence = score.clamp(0.0, 1.0);
            reordered.push(candidate);
        }
    }

    // Anything the vendor response didn't mention (or mentioned twice, so
    // the slot was already taken) keeps its place at the tail, preserving
    // the "never drop a candidate" guarantee.
    reordered.extend(slots.into_iter().flatten());
    reordered
}
