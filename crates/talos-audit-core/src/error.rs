//! # Domain Error Taxonomy
//!
//! A small, transport-agnostic set of error kinds. `talos-audit-http` maps
//! each variant to an HTTP status; the core itself never knows about HTTP.

use thiserror::Error;

/// Errors raised by the ingest orchestrator and the ports it depends on.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input failed a structural or semantic check (bad hash, malformed
    /// cursor, missing field). Caller can retry with corrected input.
    #[error("validation error: {0}")]
    Validation(String),

    /// An event with this id was already accepted.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A proof or lookup was requested for an unknown event.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other domain failure, including adapter I/O errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        DomainError::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        DomainError::NotFound(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        DomainError::Internal(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
