//! FallbackEmitter (C7, §4.7) — synthesizes deterministic minimal
//! candidates when every provider attempt produced nothing usable.

use std::collections::HashMap;

use crate::config::Mode;
use crate::contracts::Candidate;

const NO_CONTEXT_MESSAGE: &str = "No relevant context found in your notes.";

pub struct FallbackEmitter;

impl FallbackEmitter {
    /// `fast` mode accepts a hard-empty result; `accurate`/`conversation`
    /// get a single zero-confidence placeholder candidate so the Planner
    /// still has something to anchor a response on (§4.7).
    pub fn emit(mode: Mode) -> Vec<Candidate> {
        match mode {
            Mode::Fast => Vec::new(),
            Mode::Accurate | Mode::Conversation => {
                vec![Candidate::new(NO_CONTEXT_MESSAGE, "fallback", 0.0, HashMap::new())]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_mode_emits_nothing() {
        assert!(FallbackEmitter::emit(Mode::Fast).is_empty());
    }

    #[test]
    fn accurate_and_conversation_emit_a_placeholder() {
        for mode in [Mode::Accurate, Mode::Conversation] {
            let candidates = FallbackEmitter::emit(mode);
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].source, "fallback");
            assert_eq!(candidates[0].confidence, 0.0);
        }
    }
}
