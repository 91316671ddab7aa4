//! Immutable schemas for every value crossing a component boundary (§4.1).
//!
//! No component internal to the engine invents an "alternate shape" of a
//! contract — cross-boundary data is strictly what's defined here. Closed
//! enumerations reject out-of-set values at construction with
//! [`crate::error::EngineError::ContractViolation`], the same way the
//! teacher's trait-and-type split (`memory/core/{traits,types}.rs`) keeps
//! storage concerns away from the shape of what gets stored.

mod candidate;
mod chunk;
mod context_packet;
mod conversation;
mod document;
mod response;
mod trace;

pub use candidate::Candidate;
pub use chunk::{Chunk, ChunkStatus};
pub use context_packet::{ContextPacket, ContextSummary, RoutingMetadata};
pub use conversation::{ConversationState, ConversationTurn, Role};
pub use document::{Document, KnowledgeType, SourceOrigin};
pub use response::{ActionTaken, PlannerResponse, RetrievalMetadata};
pub use trace::{RetrievalTrace, TraceKind};
