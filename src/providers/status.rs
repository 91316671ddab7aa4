//! ProviderStatus (§4.6) — tracks per-provider health so the router can
//! skip a provider that just failed instead of paying its timeout again on
//! every request during a cooldown window.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Healthy,
    Cooldown,
}

struct ProviderState {
    status: ProviderStatus,
    cooldown_until: Option<DateTime<Utc>>,
}

/// Thread-safe map from provider name to health state, grounded in the
/// teacher's `SessionManager`'s `RwLock<HashMap<_, _>>` pattern
/// (`memory/features/session.rs`).
pub struct ProviderStatusMap {
    states: RwLock<HashMap<String, ProviderState>>,
    cooldown: Duration,
}

impl ProviderStatusMap {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
            cooldown,
        }
    }

    /// Called after a provider's call completed. An error starts (or
    /// extends) its cooldown window; success clears it immediately.
    pub fn record(&self, provider: &str, succeeded: bool, now: DateTime<Utc>) {
        let mut states = self.states.write();
        if succeeded {
            states.remove(provider);
        } else {
            states.insert(
                provider.to_string(),
                ProviderState {
                    status: ProviderStatus::Cooldown,
                    cooldown_until: Some(now + chrono::Duration::from_std(self.cooldown).unwrap_or_default()),
                },
            );
            metrics::counter!("recall_provider_cooldowns_total", "provider" => provider.to_string()).increment(1);
        }
    }

    /// Whether the router should skip this provider right now (§4.6:
    /// cooldown-aware skipping). A provider whose cooldown window has
    /// elapsed is treated as healthy again without an explicit reset call.
    pub fn is_in_cooldown(&self, provider: &str, now: DateTime<Utc>) -> bool {
        let states = self.states.read();
        match states.get(provider) {
            Some(state) if state.status == ProviderStatus::Cooldown => {
                state.cooldown_until.map(|until| now < until).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn status(&self, provider: &str, now: DateTime<Utc>) -> ProviderStatus {
        if self.is_in_cooldown(provider, now) {
            ProviderStatus::Cooldown
        } else {
            ProviderStatus::Healthy
        }
    }
}
