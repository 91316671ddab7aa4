//! Central configuration for the recall/planning engine.
//!
//! Composed of domain sub-configs the same way `mira-backend`'s
//! `config/mod.rs` composes `GeminiConfig`/`MemoryConfig`/`ServerConfig`,
//! but deliberately **not** a `lazy_static` global: a `Config` is built once
//! via [`Config::from_env`] (or [`Config::default`] for tests) and handed
//! out as `Arc<Config>` to the components that need it. No component reads
//! the process environment again after construction (§5, §9).

mod modes;
mod thresholds;
mod timeouts;

pub use modes::{Mode, ModeDefaults, ModeRouting};
pub use thresholds::ThresholdsConfig;
pub use timeouts::TimeoutsConfig;

use crate::error::{EngineError, EngineResult};
use std::collections::HashSet;

/// Embedding dimension, timeout constants, threshold constants and eviction
/// limits are all construction-time parameters (§5) — immutable for the
/// lifetime of the engine instance.
#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: ThresholdsConfig,
    pub timeouts: TimeoutsConfig,
    pub modes: ModeDefaults,
    pub embedding_dimension: usize,
    pub conversation: ConversationConfig,
    pub trace: TraceConfig,
    pub provider_status: ProviderStatusConfig,
    pub providers_enabled: HashSet<String>,
    pub llm_enabled: bool,
    pub secrets: Secrets,
}

#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub max_turns: usize,
    pub max_sessions: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: 50,
            max_sessions: 1000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub max_events: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self { max_events: 10_000 }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderStatusConfig {
    pub cooldown_seconds: u64,
}

impl Default for ProviderStatusConfig {
    fn default() -> Self {
        Self { cooldown_seconds: 30 }
    }
}

/// Credentials, captured once at construction and cached — never mutated
/// into the process environment (§5's "no global mutation" rule, §9's
/// "mutable global configuration" redesign flag).
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub embedding_api_key: Option<String>,
    pub memory_service_api_key: Option<String>,
    pub llm_api_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables (optionally via a
    /// `.env` file), exactly once. Mirrors `MiraConfig::from_env`'s shape,
    /// minus the anti-pattern of re-reading the environment later.
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            thresholds: ThresholdsConfig::from_env(),
            timeouts: TimeoutsConfig::from_env(),
            modes: ModeDefaults::default(),
            embedding_dimension: std::env::var("EMBEDDING_DIMENSION")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1024),
            conversation: ConversationConfig {
                max_turns: std::env::var("CONVERSATION_MAX_TURNS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(50),
                max_sessions: std::env::var("CONVERSATION_MAX_SESSIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1000),
            },
            trace: TraceConfig {
                max_events: std::env::var("TRACE_MAX_EVENTS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            },
            provider_status: ProviderStatusConfig {
                cooldown_seconds: std::env::var("PROVIDER_COOLDOWN_SECONDS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
            providers_enabled: std::env::var("PROVIDERS_ENABLED")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_else(|| {
                    ["vector".to_string(), "mock".to_string()].into_iter().collect()
                }),
            llm_enabled: std::env::var("LLM_ENABLED")
                .ok()
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            secrets: Secrets {
                embedding_api_key: std::env::var("EMBEDDING_API_KEY").ok(),
                memory_service_api_key: std::env::var("MEMORY_SERVICE_API_KEY").ok(),
                llm_api_key: std::env::var("LLM_API_KEY").ok(),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.conversation.max_turns < 1 {
            return Err(EngineError::InvalidConfig(
                "conversation.max_turns must be >= 1".into(),
            ));
        }
        if self.conversation.max_sessions < 1 {
            return Err(EngineError::InvalidConfig(
                "conversation.max_sessions must be >= 1".into(),
            ));
        }
        if self.trace.max_events < 1 {
            return Err(EngineError::InvalidConfig(
                "trace.max_events must be >= 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    /// A construction-time default suitable for tests — does not touch the
    /// environment.
    fn default() -> Self {
        Self {
            thresholds: ThresholdsConfig::default(),
            timeouts: TimeoutsConfig::default(),
            modes: ModeDefaults::default(),
            embedding_dimension: 1024,
            conversation: ConversationConfig::default(),
            trace: TraceConfig::default(),
            provider_status: ProviderStatusConfig::default(),
            providers_enabled: ["vector".to_string(), "mock".to_string()].into_iter().collect(),
            llm_enabled: false,
            secrets: Secrets::default(),
        }
    }
}
