//! Second Brain recall-and-planning engine.
//!
//! This crate implements the core retrieval/planning pipeline described in
//! the project specification: a [`RecallOrchestrator`](orchestrator::RecallOrchestrator)
//! routes a query across one or more memory providers, merges and
//! optionally reranks the results into a [`ContextPacket`](contracts::ContextPacket),
//! and a [`Planner`](planner::Planner) classifies that packet into a branch
//! and composes a grounded [`PlannerResponse`](contracts::PlannerResponse).
//!
//! Everything crossing a component boundary is one of the closed
//! [`contracts`]; every external capability (embedding, vector search,
//! rerank, LLM) is a [`ports`] trait with a real HTTP-backed adapter and a
//! deterministic in-process mock, so the full pipeline is exercisable
//! without any live credentials.

pub mod branch_policy;
pub mod config;
pub mod contracts;
pub mod conversation_store;
pub mod error;
pub mod fallback;
pub mod orchestrator;
pub mod planner;
pub mod ports;
pub mod providers;
pub mod router;
pub mod trace_collector;

pub use config::Config;
pub use contracts::{ActionTaken, ContextPacket, PlannerResponse};
pub use error::{EngineError, EngineResult};
pub use planner::{ChatRequest, Planner};
