//! Mode strings and per-mode routing defaults (§4.6, §6.1, §6.3).

use crate::error::EngineError;
use std::collections::HashMap;
use std::str::FromStr;

/// Caller-selected retrieval strategy. The closed set is validated at the
/// engine API boundary (§6.1) — an unknown mode string fails with
/// `invalid_argument` rather than being silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Fast,
    Accurate,
    Conversation,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Accurate => "accurate",
            Mode::Conversation => "conversation",
        }
    }
}

impl FromStr for Mode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Mode::Fast),
            "accurate" => Ok(Mode::Accurate),
            "conversation" => Ok(Mode::Conversation),
            other => Err(EngineError::InvalidArgument(format!(
                "unknown mode '{other}' (expected fast, accurate, or conversation)"
            ))),
        }
    }
}

/// Routing defaults for a single mode (the row of §4.6's table).
#[derive(Debug, Clone)]
pub struct ModeRouting {
    pub top_k: usize,
    /// `top_k` to keep after an optional rerank pass narrows the merged set
    /// (only meaningful when `rerank` is true and differs from `top_k`).
    pub post_rerank_top_k: usize,
    pub threshold: f32,
    pub rerank: bool,
    /// When true, attempt every enabled provider; otherwise attempt only
    /// the primary vector provider (plus external memory for
    /// `conversation`, if configured).
    pub use_all_providers: bool,
}

#[derive(Debug, Clone)]
pub struct ModeDefaults {
    routing: HashMap<Mode, ModeRouting>,
}

impl Default for ModeDefaults {
    fn default() -> Self {
        let mut routing = HashMap::new();
        routing.insert(
            Mode::Fast,
            ModeRouting {
                top_k: 5,
                post_rerank_top_k: 5,
                threshold: 0.60,
                rerank: false,
                use_all_providers: false,
            },
        );
        routing.insert(
            Mode::Accurate,
            ModeRouting {
                top_k: 10,
                post_rerank_top_k: 5,
                threshold: 0.55,
                rerank: true,
                use_all_providers: true,
            },
        );
        routing.insert(
            Mode::Conversation,
            ModeRouting {
                top_k: 5,
                post_rerank_top_k: 5,
                threshold: 0.60,
                rerank: true,
                use_all_providers: false,
            },
        );
        Self { routing }
    }
}

impl ModeDefaults {
    pub fn get(&self, mode: Mode) -> &ModeRouting {
        self.routing
            .get(&mode)
            .expect("ModeDefaults is populated for every Mode variant at construction")
    }
}
