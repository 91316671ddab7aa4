//! Per-port and per-request timeout/deadline constants (§5, §6.3
//! `timeouts.*`). All are construction-time and immutable for the life of
//! the engine instance.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutsConfig {
    pub embed: Duration,
    pub vector: Duration,
    pub memory: Duration,
    pub rerank: Duration,
    pub llm: Duration,
    pub request_fast: Duration,
    pub request_accurate: Duration,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            embed: Duration::from_secs(15),
            vector: Duration::from_secs(10),
            memory: Duration::from_secs(10),
            rerank: Duration::from_secs(10),
            llm: Duration::from_secs(120),
            request_fast: Duration::from_secs(30),
            request_accurate: Duration::from_secs(60),
        }
    }
}

impl TimeoutsConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        macro_rules! env_secs {
            ($var:literal, $field:ident) => {
                if let Some(v) = std::env::var($var).ok().and_then(|v| v.parse().ok()) {
                    config.$field = Duration::from_secs(v);
                }
            };
        }
        env_secs!("TIMEOUT_EMBED_SECS", embed);
        env_secs!("TIMEOUT_VECTOR_SECS", vector);
        env_secs!("TIMEOUT_MEMORY_SECS", memory);
        env_secs!("TIMEOUT_RERANK_SECS", rerank);
        env_secs!("TIMEOUT_LLM_SECS", llm);
        env_secs!("TIMEOUT_REQUEST_FAST_SECS", request_fast);
        env_secs!("TIMEOUT_REQUEST_ACCURATE_SECS", request_accurate);
        config
    }

    /// The per-request deadline for a given [`crate::config::Mode`].
    pub fn request_deadline(&self, mode: super::Mode) -> Duration {
        match mode {
            super::Mode::Accurate => self.request_accurate,
            super::Mode::Fast | super::Mode::Conversation => self.request_fast,
        }
    }
}
