//! Error types for the audit crate.

use thiserror::Error;

/// Errors that can occur while writing or reading the audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    /// An entry could not be persisted.
    #[error("failed to write audit entry: {0}")]
    WriteFailed(String),

    /// Stored entries could not be read back.
    #[error("failed to query audit entries: {0}")]
    QueryFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
