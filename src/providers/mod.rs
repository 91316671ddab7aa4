//! MemoryProvider (C4, §4.4) — a tagged enum of provider kinds rather than
//! a single trait object with runtime string branching (§9's "variant
//! providers" redesign flag: the closed set of kinds is known at compile
//! time, so `match` is exhaustive instead of an `if name == "vector"`
//! chain scattered across the router).

mod external_memory_provider;
mod mock_provider;
mod status;
mod vector_provider;

pub use external_memory_provider::{ExternalMemoryHit, ExternalMemoryProvider};
pub use mock_provider::{MockEntry, MockProvider};
pub use status::{ProviderStatus, ProviderStatusMap};
pub use vector_provider::VectorProvider;

use async_trait::async_trait;

use crate::contracts::Candidate;

/// Per-call parameters the router derives from the mode table (§4.6) and
/// passes down to whichever provider it invokes.
#[derive(Debug, Clone)]
pub struct ProviderQuery {
    pub text: String,
    pub top_k: usize,
    pub threshold: f32,
}

/// What a provider call produced, whether it succeeded or failed — the
/// errors-as-data shape (§4.4, §7): a failed call still returns a
/// `ProviderOutcome` (possibly with zero candidates), never a bare `Err`
/// that would abort the orchestrator's fan-out.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub provider: String,
    pub candidates: Vec<Candidate>,
    pub raw_hit_count: usize,
    pub error: Option<String>,
    /// A stable, sanitizer-safe tag for `error` (an `EngineError::kind()`
    /// value, or a provider-local tag like `"partial_result"`) — the thing
    /// the planner's error-branch template is allowed to render, since the
    /// raw `error` string can carry upstream prose the sanitizer would
    /// otherwise have to scrub (§4.10, §7).
    pub error_kind: Option<&'static str>,
}

impl ProviderOutcome {
    pub fn ok(provider: impl Into<String>, candidates: Vec<Candidate>, raw_hit_count: usize) -> Self {
        Self {
            provider: provider.into(),
            candidates,
            raw_hit_count,
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(provider: impl Into<String>, error_kind: &'static str, error: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            candidates: Vec::new(),
            raw_hit_count: 0,
            error: Some(error.into()),
            error_kind: Some(error_kind),
        }
    }

    /// Same shape as [`Self::failed`] but carries whatever candidates were
    /// retrieved before the error occurred (§4.4's "partial success": a
    /// provider that got through a partial result set before the
    /// underlying call failed reports both).
    pub fn partial(
        provider: impl Into<String>,
        candidates: Vec<Candidate>,
        raw_hit_count: usize,
        error_kind: &'static str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            candidates,
            raw_hit_count,
            error: Some(error.into()),
            error_kind: Some(error_kind),
        }
    }
}

/// Implemented by every provider variant. The trait itself is never used
/// as a trait object in the router — [`MemoryProvider`] is a closed `enum`
/// over the three kinds — but stays a trait so each variant's internals
/// are unit-testable in isolation the way the teacher tests
/// `MemoryStore` implementors individually.
#[async_trait]
pub trait MemoryProviderImpl: Send + Sync {
    async fn recall(&self, query: &ProviderQuery) -> ProviderOutcome;
    fn name(&self) -> &'static str;
}

/// The tagged union the router dispatches on (§4.4, §9). Adding a new
/// provider kind means adding a variant here and one `match` arm in
/// [`MemoryProvider::recall`] — the compiler enforces every call site is
/// updated, unlike a trait-object registry keyed by string.
pub enum MemoryProvider {
    Vector(VectorProvider),
    ExternalMemory(ExternalMemoryProvider),
    Mock(MockProvider),
}

impl MemoryProvider {
    pub async fn recall(&self, query: &ProviderQuery) -> ProviderOutcome {
        match self {
            MemoryProvider::Vector(p) => p.recall(query).await,
            MemoryProvider::ExternalMemory(p) => p.recall(query).await,
            MemoryProvider::Mock(p) => p.recall(query).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MemoryProvider::Vector(p) => p.name(),
            MemoryProvider::ExternalMemory(p) => p.name(),
            MemoryProvider::Mock(p) => p.name(),
        }
    }
}
