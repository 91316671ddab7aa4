//! RecallOrchestrator (C8, §4.8) — drives one retrieval from query text to
//! a `ContextPacket`, composing the router, the provider variants, and the
//! optional rerank pass. Grounded in the teacher's `RecallEngine::recall`
//! (`memory/features/recall_engine/mod.rs`), which plays the identical
//! role: fan out, merge, score, truncate.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{Config, Mode};
use crate::contracts::{Candidate, ContextPacket, RoutingMetadata, TraceKind};
use crate::fallback::FallbackEmitter;
use crate::ports::rerank::{RerankMetadata, RerankType};
use crate::ports::RerankPort;
use crate::providers::{ProviderQuery, ProviderStatusMap};
use crate::router::{ProviderRegistry, ProviderRouter};
use crate::trace_collector::TraceCollector;

pub struct RecallOrchestrator {
    router: ProviderRouter,
    reranker: Option<Arc<dyn RerankPort>>,
    status: Arc<ProviderStatusMap>,
    trace: Arc<TraceCollector>,
    config: Arc<Config>,
}

impl RecallOrchestrator {
    pub fn new(
        status: Arc<ProviderStatusMap>,
        reranker: Option<Arc<dyn RerankPort>>,
        trace: Arc<TraceCollector>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            router: ProviderRouter::new(status.clone()),
            reranker,
            status,
            trace,
            config,
        }
    }

    /// `deadline` is the absolute instant by which the packet must be
    /// returned (§5's per-request deadline, S6). Callers compute it once
    /// from `config.timeouts.request_deadline(mode)` at the start of a
    /// `chat`/`recall_search` call.
    pub async fn recall(
        &self,
        query_text: &str,
        mode: Mode,
        registry: &ProviderRegistry,
        deadline: Instant,
        top_k_override: Option<usize>,
        threshold_override: Option<f32>,
    ) -> ContextPacket {
        let trace_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let plan = self.router.plan(mode, &self.config.modes, registry, now);
        let top_k = top_k_override.unwrap_or(plan.top_k);
        let threshold = threshold_override.unwrap_or(plan.threshold);

        self.trace.record(
            trace_id.clone(),
            TraceKind::RecallBegin,
            attrs([
                ("mode", mode.as_str().into()),
                ("top_k", top_k.into()),
                ("threshold", (threshold as f64).into()),
            ]),
        );

        let mut routing_metadata = Vec::new();
        for skipped in &plan.skipped {
            routing_metadata.push(RoutingMetadata {
                provider: skipped.name.to_string(),
                raw_hit_count: 0,
                rerank_applied: false,
                fallback_reason: Some(skipped.reason.clone()),
                latency_ms: 0,
                error: None,
                error_kind: None,
            });
        }

        let mut all_candidates = Vec::new();
        let mut providers_used = Vec::new();
        let mut providers_failed = Vec::new();

        for (name, provider) in plan.attempt_names.iter().zip(plan.attempt.iter()) {
            if Instant::now() >= deadline {
                debug!(trace_id = %trace_id, "request deadline reached, no further provider calls issued");
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let per_call_timeout = self.provider_timeout(name).min(remaining);

            let query = ProviderQuery { text: query_text.to_string(), top_k, threshold };
            let start = Instant::now();

            let outcome = match tokio::time::timeout(per_call_timeout, provider.recall(&query)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(trace_id = %trace_id, provider = %name, "provider call timed out");
                    crate::providers::ProviderOutcome::failed(*name, "timeout", "timeout")
                }
            };
            let latency_ms = start.elapsed().as_millis() as u64;

            self.status.record(name, outcome.error.is_none(), Utc::now());

            self.trace.record(
                trace_id.clone(),
                TraceKind::ProviderCall,
                attrs([
                    ("provider", (*name).into()),
                    ("raw_hit_count", outcome.raw_hit_count.into()),
                    ("latency_ms", latency_ms.into()),
                    ("error", outcome.error.clone().map(Into::into).unwrap_or(serde_json::Value::Null)),
                ]),
            );

            if let Some(error) = &outcome.error {
                providers_failed.push(name.to_string());
                routing_metadata.push(RoutingMetadata {
                    provider: name.to_string(),
                    raw_hit_count: outcome.raw_hit_count,
                    rerank_applied: false,
                    fallback_reason: None,
                    latency_ms,
                    error: Some(error.clone()),
                    error_kind: outcome.error_kind.map(str::to_string),
                });
            } else {
                providers_used.push(name.to_string());
                routing_metadata.push(RoutingMetadata {
                    provider: name.to_string(),
                    raw_hit_count: outcome.raw_hit_count,
                    rerank_applied: false,
                    fallback_reason: None,
                    latency_ms,
                    error: None,
                    error_kind: None,
                });
            }

            all_candidates.extend(outcome.candidates);

            metrics::counter!("recall_provider_calls_total", "provider" => name.to_string()).increment(1);
        }

        let mut merged = dedup_keep_highest(all_candidates);
        merged.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

        let routing = self.config.modes.get(mode);

        // rerank_metadata is §4.5's own return value (rerank_type/model/
        // latency/fallback_reason) — finer-grained than the per-provider
        // `RoutingMetadata.rerank_applied` bool below, which only tells a
        // caller whether a given provider's candidates were touched by it.
        let mut rerank_metadata: Option<RerankMetadata> = None;
        if plan.rerank && !merged.is_empty() {
            match &self.reranker {
                Some(reranker) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let timeout = self.config.timeouts.rerank.min(remaining);
                    let start = Instant::now();
                    let metadata = match tokio::time::timeout(
                        timeout,
                        reranker.rerank(query_text, merged.clone(), routing.post_rerank_top_k),
                    )
                    .await
                    {
                        Ok(Ok((reranked, metadata))) => {
                            merged = reranked;
                            for entry in routing_metadata.iter_mut() {
                                if providers_used.iter().any(|p| p == &entry.provider) {
                                    entry.rerank_applied = true;
                                }
                            }
                            metadata
                        }
                        Ok(Err(e)) => {
                            warn!(trace_id = %trace_id, error = %e, "rerank call failed, keeping unranked merge order");
                            RerankMetadata {
                                rerank_type: RerankType::None,
                                model: None,
                                latency_ms: start.elapsed().as_millis() as u64,
                                fallback_reason: Some(e.kind().to_string()),
                            }
                        }
                        Err(_) => {
                            warn!(trace_id = %trace_id, "rerank call timed out, keeping unranked merge order");
                            RerankMetadata {
                                rerank_type: RerankType::None,
                                model: None,
                                latency_ms: start.elapsed().as_millis() as u64,
                                fallback_reason: Some("timeout".to_string()),
                            }
                        }
                    };
                    self.trace.record(
                        trace_id.clone(),
                        TraceKind::Rerank,
                        attrs([(
                            "rerank_type",
                            serde_json::to_value(&metadata.rerank_type).unwrap_or(serde_json::Value::Null),
                        )]),
                    );
                    rerank_metadata = Some(metadata);
                }
                None => {
                    rerank_metadata = Some(RerankMetadata {
                        rerank_type: RerankType::None,
                        model: None,
                        latency_ms: 0,
                        fallback_reason: Some("reranker_not_configured".to_string()),
                    });
                }
            }
        }

        merged.truncate(routing.post_rerank_top_k);

        let mut fallback_emitted = false;
        let mut branch_hint = None;
        if merged.is_empty() && !providers_failed.is_empty() {
            merged = FallbackEmitter::emit(mode);
            fallback_emitted = true;
            metrics::counter!("recall_fallback_emitted_total", "mode" => mode.as_str()).increment(1);
            self.trace.record(trace_id.clone(), TraceKind::Fallback, attrs([("mode", mode.as_str().into())]));

            if providers_used.is_empty() && plan.attempt_names.len() == providers_failed.len() {
                branch_hint = Some("ERROR".to_string());
            }
        }

        let packet = ContextPacket::new(
            merged,
            providers_used,
            providers_failed,
            routing_metadata,
            trace_id.clone(),
            Utc::now(),
            branch_hint,
            fallback_emitted,
            rerank_metadata,
        );

        self.trace.record(
            trace_id,
            TraceKind::RecallEnd,
            attrs([
                ("candidate_count", packet.summary.candidate_count.into()),
                ("top_confidence", (packet.summary.top_confidence as f64).into()),
            ]),
        );

        packet
    }

    /// The outer per-call budget handed to `tokio::time::timeout` around
    /// `provider.recall(...)`. For "vector" this must cover both of
    /// `VectorProvider`'s own internal budgets (embed, then search) since
    /// it times each of those steps separately against `T_embed`/`T_vector`.
    fn provider_timeout(&self, provider_name: &str) -> std::time::Duration {
        match provider_name {
            "vector" => self.config.timeouts.embed + self.config.timeouts.vector,
            "external_memory" => self.config.timeouts.memory,
            _ => self.config.timeouts.vector,
        }
    }
}

fn dedup_keep_highest(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut best: HashMap<String, Candidate> = HashMap::new();
    for candidate in candidates {
        let key = candidate.dedup_key();
        match best.get(&key) {
            Some(existing) if existing.confidence >= candidate.confidence => {}
            _ => {
                best.insert(key, candidate);
            }
        }
    }
    best.into_values().collect()
}

fn attrs<const N: usize>(pairs: [(&str, serde_json::Value); N]) -> HashMap<String, serde_json::Value> {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MemoryProvider, MockEntry, MockProvider};
    use crate::router::NamedProvider;
    use std::time::Duration;

    fn orchestrator(config: Arc<Config>) -> RecallOrchestrator {
        RecallOrchestrator::new(
            Arc::new(ProviderStatusMap::new(Duration::from_secs(30))),
            None,
            Arc::new(TraceCollector::new(1000)),
            config,
        )
    }

    fn orchestrator_with_reranker(config: Arc<Config>) -> RecallOrchestrator {
        RecallOrchestrator::new(
            Arc::new(ProviderStatusMap::new(Duration::from_secs(30))),
            Some(Arc::new(crate::ports::rerank::MockReranker::default())),
            Arc::new(TraceCollector::new(1000)),
            config,
        )
    }

    #[tokio::test]
    async fn empty_corpus_with_no_failures_yields_no_fallback() {
        let config = Arc::new(Config::default());
        let orchestrator = orchestrator(config.clone());
        let registry = ProviderRegistry {
            mock: Some(NamedProvider {
                name: "mock",
                provider: Arc::new(MemoryProvider::Mock(MockProvider::new(vec![]))),
            }),
            ..Default::default()
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let packet = orchestrator.recall("anything", Mode::Fast, &registry, deadline, None, None).await;

        assert!(packet.candidates.is_empty());
        assert!(packet.summary.providers_failed.is_empty());
        assert!(!packet.fallback_emitted);
    }

    #[tokio::test]
    async fn seeded_mock_returns_ranked_candidates() {
        let config = Arc::new(Config::default());
        let orchestrator = orchestrator(config.clone());
        let registry = ProviderRegistry {
            mock: Some(NamedProvider {
                name: "mock",
                provider: Arc::new(MemoryProvider::Mock(MockProvider::new(vec![MockEntry {
                    content: "notes about retrieval augmented generation".to_string(),
                    metadata: HashMap::new(),
                }]))),
            }),
            ..Default::default()
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let packet = orchestrator
            .recall("retrieval augmented generation", Mode::Fast, &registry, deadline, None, Some(0.1))
            .await;

        assert_eq!(packet.candidates.len(), 1);
        assert_eq!(packet.summary.top_confidence, packet.candidates[0].confidence);
    }

    #[tokio::test]
    async fn rerank_metadata_is_populated_when_a_reranker_runs() {
        let config = Arc::new(Config::default());
        let orchestrator = orchestrator_with_reranker(config.clone());
        let registry = ProviderRegistry {
            mock: Some(NamedProvider {
                name: "mock",
                provider: Arc::new(MemoryProvider::Mock(MockProvider::new(vec![MockEntry {
                    content: "notes about retrieval augmented generation".to_string(),
                    metadata: HashMap::new(),
                }]))),
            }),
            ..Default::default()
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let packet = orchestrator
            .recall("retrieval augmented generation", Mode::Accurate, &registry, deadline, None, Some(0.1))
            .await;

        let metadata = packet.rerank_metadata.expect("accurate mode always reranks");
        assert_eq!(metadata.rerank_type, RerankType::Mock);
        assert!(metadata.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn rerank_metadata_marks_missing_reranker_as_a_fallback() {
        let config = Arc::new(Config::default());
        let orchestrator = orchestrator(config.clone());
        let registry = ProviderRegistry {
            mock: Some(NamedProvider {
                name: "mock",
                provider: Arc::new(MemoryProvider::Mock(MockProvider::new(vec![MockEntry {
                    content: "notes about retrieval augmented generation".to_string(),
                    metadata: HashMap::new(),
                }]))),
            }),
            ..Default::default()
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        let packet = orchestrator
            .recall("retrieval augmented generation", Mode::Accurate, &registry, deadline, None, Some(0.1))
            .await;

        let metadata = packet.rerank_metadata.expect("accurate mode always reranks");
        assert_eq!(metadata.rerank_type, RerankType::None);
        assert_eq!(metadata.fallback_reason.as_deref(), Some("reranker_not_configured"));
    }
}
