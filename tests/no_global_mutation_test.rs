//! §8 property 12 — handling a request never mutates the process
//! environment. `Config` is constructed once and threaded through as an
//! `Arc`, never re-read from `std::env` mid-request (§5's "no global
//! mutation of process environment" rule, §9's redesign flag against a
//! `lazy_static!` global config).

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use secondbrain_engine::config::{Config, Mode};
use secondbrain_engine::planner::ChatRequest;

fn env_snapshot() -> HashMap<String, String> {
    std::env::vars().collect()
}

#[tokio::test]
async fn chat_never_mutates_the_process_environment() {
    let before = env_snapshot();

    let config = Arc::new(Config::default());
    let planner = common::planner_with(config);
    let registry = common::registry_with_failing_vector();

    let _ = planner
        .chat(
            ChatRequest {
                query: "does this touch the environment?",
                session_id: None,
                mode: Mode::Accurate,
                top_k: None,
                threshold: None,
                force_branch: None,
            },
            &registry,
        )
        .await
        .unwrap();

    let after = env_snapshot();
    assert_eq!(before, after);
}
