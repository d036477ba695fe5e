//! Typed error taxonomy shared by every control-plane component.

use thiserror::Error;

/// Errors returned by [`crate::orchestrator::Orchestrator`] and the components
/// it wires together.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no healthy nodes available")]
    NoHealthyNodes,

    #[error("insufficient resources to satisfy request")]
    InsufficientResources,

    #[error("scheduling race lost after retries")]
    RaceLost,

    #[error("container runtime unavailable: {0}")]
    RuntimeBackendUnavailable(String),
}

impl CoreError {
    /// Stable, low-cardinality label for metrics (mirrors the pattern of
    /// labeling error variants for Prometheus counters).
    pub fn label(&self) -> &'static str {
        match self {
            CoreError::InvalidInput(_) => "invalid_input",
            CoreError::NotFound(_) => "not_found",
            CoreError::NoHealthyNodes => "no_healthy_nodes",
            CoreError::InsufficientResources => "insufficient_resources",
            CoreError::RaceLost => "race_lost",
            CoreError::RuntimeBackendUnavailable(_) => "runtime_unavailable",
        }
    }

    /// Whether an external caller should see this as `InsufficientResources`.
    /// `RaceLost` is kept distinct internally (logged and counted separately)
    /// but collapses to the same externally visible condition.
    pub fn as_external(&self) -> CoreError {
        match self {
            CoreError::RaceLost => CoreError::InsufficientResources,
            other => other.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
