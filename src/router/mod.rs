//! ProviderRouter (C6, §4.6) — picks which providers to query for a given
//! mode, honoring cooldown state, and whether the plan should rerank.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::{Mode, ModeDefaults};
use crate::providers::{MemoryProvider, ProviderStatusMap};

/// A provider the router knows about, named the way `routing_metadata`
/// names it (§3, §4.6's policy table).
pub struct NamedProvider {
    pub name: &'static str,
    pub provider: Arc<MemoryProvider>,
}

/// The full set of providers this deployment could use, in router
/// priority order: vector first (primary), external memory second,
/// mock last (only relevant when the others are disabled, e.g. local
/// development).
#[derive(Default)]
pub struct ProviderRegistry {
    pub vector: Option<NamedProvider>,
    pub external_memory: Option<NamedProvider>,
    pub mock: Option<NamedProvider>,
}

impl ProviderRegistry {
    fn ordered(&self) -> Vec<&NamedProvider> {
        [&self.vector, &self.external_memory, &self.mock]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// A skipped-provider entry: the router decided not to call it, along with
/// why, so the orchestrator can still produce a `routing_metadata` record
/// for it (§4.6: cooldown-skipped providers are recorded with
/// `fallback_reason="in_cooldown"`).
pub struct SkippedProvider {
    pub name: &'static str,
    pub reason: String,
}

pub struct RouterPlan {
    pub attempt: Vec<Arc<MemoryProvider>>,
    pub attempt_names: Vec<&'static str>,
    pub skipped: Vec<SkippedProvider>,
    pub rerank: bool,
    pub top_k: usize,
    pub threshold: f32,
}

pub struct ProviderRouter {
    status: Arc<ProviderStatusMap>,
}

impl ProviderRouter {
    pub fn new(status: Arc<ProviderStatusMap>) -> Self {
        Self { status }
    }

    /// Always returns a plan, even when every provider is in cooldown —
    /// an empty `attempt` list just means the orchestrator falls straight
    /// through to the fallback emitter (§4.6: "the router always returns a
    /// plan, even if the plan is 'use fallback emitter only'").
    pub fn plan(&self, mode: Mode, defaults: &ModeDefaults, registry: &ProviderRegistry, now: DateTime<Utc>) -> RouterPlan {
        let routing = defaults.get(mode);
        let candidates = self.select_candidates(mode, registry);

        let mut attempt = Vec::new();
        let mut attempt_names = Vec::new();
        let mut skipped = Vec::new();

        for named in candidates {
            if self.status.is_in_cooldown(named.name, now) {
                skipped.push(SkippedProvider {
                    name: named.name,
                    reason: "in_cooldown".to_string(),
                });
            } else {
                attempt.push(named.provider.clone());
                attempt_names.push(named.name);
            }
        }

        // accurate reranks unconditionally (once `rerank` is configured on);
        // conversation only reranks once more than one provider actually
        // contributed candidates this call (§4.6's "yes if >1 provider").
        let rerank = match mode {
            Mode::Conversation => routing.rerank && attempt.len() > 1,
            _ => routing.rerank,
        };

        RouterPlan {
            attempt,
            attempt_names,
            skipped,
            rerank,
            top_k: routing.top_k,
            threshold: routing.threshold,
        }
    }

    fn select_candidates<'a>(&self, mode: Mode, registry: &'a ProviderRegistry) -> Vec<&'a NamedProvider> {
        match mode {
            Mode::Fast => {
                let primary = registry.vector.as_ref().or(registry.mock.as_ref());
                primary.into_iter().collect()
            }
            Mode::Accurate => registry.ordered(),
            Mode::Conversation => {
                let mut picked: Vec<&NamedProvider> = [&registry.vector, &registry.external_memory]
                    .into_iter()
                    .flatten()
                    .collect();
                if picked.is_empty() {
                    picked.extend(registry.mock.as_ref());
                }
                picked
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use std::time::Duration;

    fn mock_named() -> NamedProvider {
        NamedProvider {
            name: "mock",
            provider: Arc::new(MemoryProvider::Mock(MockProvider::new(vec![]))),
        }
    }

    #[test]
    fn fast_mode_uses_single_provider_no_rerank() {
        let router = ProviderRouter::new(Arc::new(ProviderStatusMap::new(Duration::from_secs(30))));
        let registry = ProviderRegistry { mock: Some(mock_named()), ..Default::default() };
        let plan = router.plan(Mode::Fast, &ModeDefaults::default(), &registry, Utc::now());
        assert_eq!(plan.attempt.len(), 1);
        assert!(!plan.rerank);
    }

    #[test]
    fn cooldown_provider_is_skipped_with_reason() {
        let status = Arc::new(ProviderStatusMap::new(Duration::from_secs(30)));
        let now = Utc::now();
        status.record("mock", false, now);
        let router = ProviderRouter::new(status);
        let registry = ProviderRegistry { mock: Some(mock_named()), ..Default::default() };
        let plan = router.plan(Mode::Fast, &ModeDefaults::default(), &registry, now);
        assert!(plan.attempt.is_empty());
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].reason, "in_cooldown");
    }
}
