//! Crate-wide error taxonomy.
//!
//! Mirrors the kind/recovered/surfaced table in the specification (§7):
//! most kinds never reach a caller — they are converted to metadata at a
//! port boundary (§4.4, §4.8) and the orchestrator/planner always return a
//! well-formed value. Only `InvalidArgument` and `ContractViolation` are
//! meant to propagate out of the engine API.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("credentials missing: {0}")]
    CredentialsMissing(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// The stable error-kind tag used in `provider_metadata.error` and
    /// `llm_metadata.error` — never the `Display` text, so downstream
    /// consumers can match on it without string-parsing prose.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::ContractViolation(_) => "contract_violation",
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::ProviderUnavailable(_) => "provider_unavailable",
            EngineError::CredentialsMissing(_) => "credentials_missing",
            EngineError::Timeout(_) => "timeout",
            EngineError::UpstreamUnavailable(_) => "upstream_unavailable",
            EngineError::StoreUnavailable(_) => "store_unavailable",
            EngineError::Internal(_) => "internal_error",
            EngineError::InvalidConfig(_) => "invalid_config",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
