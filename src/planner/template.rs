//! Deterministic template synthesis (§4.10) — used for the `proceed`
//! branch when no LLMPort is configured, or when the configured one
//! fails.

use crate::contracts::Candidate;

const MAX_CANDIDATE_CHARS: usize = 2000;

pub fn render_proceed(candidates: &[Candidate], top_confidence: f32) -> String {
    let mut out = format!(
        "Based on {} retrieved context(s) (top confidence {:.2}):",
        candidates.len(),
        top_confidence
    );
    for (i, candidate) in candidates.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}", i + 1, truncate(&candidate.content)));
    }
    out
}

pub fn render_low_confidence(candidates: &[Candidate], top_confidence: f32) -> String {
    let mut out = format!(
        "I found some possibly related notes, but confidence is low ({:.2}). \
         Here's what I found — you may want to rephrase or confirm:",
        top_confidence
    );
    for (i, candidate) in candidates.iter().take(3).enumerate() {
        out.push_str(&format!("\n[{}] {}", i + 1, truncate(&candidate.content)));
    }
    out
}

pub fn render_empty() -> String {
    "I couldn't find anything relevant in your notes for that question.".to_string()
}

/// A provider the orchestrator attempted and gave up on, paired with the
/// sanitized error-kind tag behind the failure (`EngineError::kind()` or a
/// provider-local category like `"partial_result"`) — never the raw error
/// string, which the error branch must never render (§4.10, §7).
pub struct FailedProvider {
    pub provider: String,
    pub error_kind: String,
}

pub fn render_error(providers_attempted: &[FailedProvider]) -> String {
    if providers_attempted.is_empty() {
        "Something went wrong while searching your notes, and no provider could be reached. \
         Please try again shortly."
            .to_string()
    } else {
        let detail = providers_attempted
            .iter()
            .map(|p| format!("{} ({})", p.provider, p.error_kind))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Something went wrong while searching your notes. The following sources were \
             unavailable: {detail}. Please try again shortly.",
        )
    }
}

pub fn render_escalate() -> String {
    "I couldn't find a confident answer in accurate mode. I can re-run this in a different \
     mode, or you can escalate this to a human reviewer."
        .to_string()
}

fn truncate(content: &str) -> String {
    if content.chars().count() <= MAX_CANDIDATE_CHARS {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(MAX_CANDIDATE_CHARS).collect();
        format!("{truncated}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn proceed_template_names_every_candidate() {
        let candidates = vec![
            Candidate::new("first note", "vector", 0.9, HashMap::new()),
            Candidate::new("second note", "vector", 0.8, HashMap::new()),
        ];
        let rendered = render_proceed(&candidates, 0.9);
        assert!(rendered.contains("[1] first note"));
        assert!(rendered.contains("[2] second note"));
    }

    #[test]
    fn truncates_long_candidate_content() {
        let long_content = "a".repeat(3000);
        let candidates = vec![Candidate::new(long_content, "vector", 0.9, HashMap::new())];
        let rendered = render_proceed(&candidates, 0.9);
        assert!(rendered.len() < 2100);
    }
}
