//! Error types for primer-init
//!
//! Only store failures and misuse of the state machine abort a run. Per-file
//! read failures, extraction failures, dependency gaps and consistency
//! findings are captured as data and folded into the ReadinessReport.

use thiserror::Error;

/// Run-level pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Store unavailable or a write could not be persisted (fatal)
    #[error("Store error: {0}")]
    Store(#[from] primer_common::Error),

    /// Root folder cannot be walked at all
    #[error("Scan error: {0}")]
    Scan(#[from] crate::services::file_walker::ScanError),

    /// Attempted a backward or post-terminal state transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: primer_common::events::PipelineState,
        to: primer_common::events::PipelineState,
    },

    /// Persisted JSON could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Background task panicked or was aborted
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for PipelineError {
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Store(primer_common::Error::Database(err))
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
