//! Error types for the compliance engine.
//!
//! None of these escape the public validation operations: validator faults
//! become DataIntegrity violations and report faults become fail-closed
//! reports. They exist so that internal code can propagate with `?`.

use thiserror::Error;

/// Internal validator fault.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Date arithmetic left chrono's representable range.
    #[error("time arithmetic out of range: {0}")]
    TimeArithmetic(String),

    /// The validator panicked.
    #[error("validator panicked: {0}")]
    Panicked(String),
}

/// Audit log store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("audit log store unavailable: {0}")]
    Unavailable(String),

    /// A query could not be answered.
    #[error("audit log query failed: {0}")]
    Query(String),
}

/// Report orchestration failure.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("check task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
