//! End-to-end scenarios S3 and S6 (§8). S1/S2/S4/S5 are covered as
//! in-crate `Planner` unit tests (`src/planner/mod.rs`); these two need a
//! custom slow/failing port double, which only makes sense to wire up
//! once, here, at the integration level.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use secondbrain_engine::config::{Config, Mode};
use secondbrain_engine::contracts::ActionTaken;
use secondbrain_engine::planner::ChatRequest;

/// S3 — all configured providers fail: `action_taken == "error"`,
/// `providers_failed` names both, and the response never leaks the raw
/// upstream error text.
#[tokio::test]
async fn s3_all_providers_fail() {
    let config = Arc::new(Config::default());
    let planner = common::planner_with(config);
    let registry = common::registry_with_failing_vector();

    let response = planner
        .chat(
            ChatRequest {
                query: "what did I write about RAG?",
                session_id: None,
                mode: Mode::Conversation,
                top_k: None,
                threshold: None,
                force_branch: None,
            },
            &registry,
        )
        .await
        .unwrap();

    assert_eq!(response.action_taken, ActionTaken::Error);
    let failed: std::collections::HashSet<_> = response.retrieval_metadata.providers_failed.into_iter().collect();
    assert_eq!(failed, ["vector".to_string(), "external_memory".to_string()].into_iter().collect());
    assert!(!response.response_text.contains("embedding backend down"));
    assert!(!response.response_text.contains("api key"));
}

/// S6 — the only provider sleeps far past the per-request deadline;
/// `chat` still returns within roughly the deadline, not the provider's
/// full delay, with a timeout recorded against that provider.
#[tokio::test]
async fn s6_deadline_exceeded_returns_promptly() {
    let mut config = Config::default();
    config.timeouts.request_fast = Duration::from_secs(2);
    config.timeouts.vector = Duration::from_secs(10);
    let planner = common::planner_with(Arc::new(config));
    let registry = common::registry_with_sleepy_vector(Duration::from_secs(20));

    let start = Instant::now();
    let response = planner
        .chat(
            ChatRequest {
                query: "anything",
                session_id: None,
                mode: Mode::Fast,
                top_k: None,
                threshold: None,
                force_branch: None,
            },
            &registry,
        )
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_secs(5), "chat took {elapsed:?}, expected it to respect the 2s deadline");
    assert_eq!(response.action_taken, ActionTaken::Error);
    assert!(response
        .retrieval_metadata
        .routing_metadata
        .iter()
        .any(|m| m.provider == "vector" && m.error.as_deref() == Some("timeout")));
}
