//! Port traits — abstractions of external capabilities (embedding, vector
//! store, rerank, LLM) with stable contracts (§4.2, §4.3, §4.5, §4.10's
//! LLMPort). Concrete adapters live alongside each trait; which adapter is
//! wired in is a [`crate::config::Config`]-driven decision the orchestrator
//! never makes directly (§4.6, §9's "variant providers" redesign note).

pub mod embedding;
pub mod llm;
pub mod rerank;
pub mod vector_store;

pub use embedding::EmbeddingPort;
pub use llm::LlmPort;
pub use rerank::RerankPort;
pub use vector_store::VectorStorePort;
