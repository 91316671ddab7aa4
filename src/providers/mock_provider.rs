//! MockProvider (§4.4) — an in-process provider backed by a fixed corpus,
//! used for local development and tests without any external service.
//! Scores by keyword overlap the same way [`crate::ports::rerank::MockReranker`]
//! does — a per-candidate scoring function in the shape of the teacher's
//! `CompositeScorer` (`memory/features/recall_engine/scoring/composite_scorer.rs`),
//! but against the single term-overlap signal spec.md §4.4 pins the mock
//! provider's confidence to, not `CompositeScorer`'s weighted recency/
//! similarity/salience/project blend.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::contracts::Candidate;

use super::{MemoryProviderImpl, ProviderOutcome, ProviderQuery};

#[derive(Debug, Clone)]
pub struct MockEntry {
    pub content: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

pub struct MockProvider {
    entries: RwLock<Vec<MockEntry>>,
}

impl MockProvider {
    pub fn new(entries: Vec<MockEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn insert(&self, entry: MockEntry) {
        self.entries.write().push(entry);
    }

    fn score(query_terms: &[String], content: &str) -> f32 {
        if query_terms.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();
        let hits = query_terms.iter().filter(|t| content_lower.contains(t.as_str())).count();
        hits as f32 / query_terms.len() as f32
    }
}

#[async_trait]
impl MemoryProviderImpl for MockProvider {
    async fn recall(&self, query: &ProviderQuery) -> ProviderOutcome {
        let query_terms: Vec<String> = query.text.split_whitespace().map(|w| w.to_lowercase()).collect();

        let entries = self.entries.read();
        let mut scored: Vec<Candidate> = entries
            .iter()
            .map(|entry| {
                let confidence = Self::score(&query_terms, &entry.content);
                Candidate::new(entry.content.clone(), "mock", confidence, entry.metadata.clone())
            })
            .filter(|c| c.confidence >= query.threshold)
            .collect();

        scored.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        let raw_count = scored.len();
        scored.truncate(query.top_k);

        ProviderOutcome::ok(self.name(), scored, raw_count)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recall_filters_by_threshold_and_ranks_by_overlap() {
        let provider = MockProvider::new(vec![
            MockEntry { content: "the roadmap for q3 planning".into(), metadata: HashMap::new() },
            MockEntry { content: "unrelated grocery list".into(), metadata: HashMap::new() },
        ]);

        let outcome = provider
            .recall(&ProviderQuery { text: "q3 planning roadmap".into(), top_k: 5, threshold: 0.3 })
            .await;

        assert!(outcome.error.is_none());
        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.candidates[0].content.contains("roadmap"));
    }

    #[tokio::test]
    async fn recall_never_errors() {
        let provider = MockProvider::new(vec![]);
        let outcome = provider
            .recall(&ProviderQuery { text: "anything".into(), top_k: 5, threshold: 0.1 })
            .await;
        assert!(outcome.error.is_none());
        assert!(outcome.candidates.is_empty());
    }
}
