//! Error types for artifact handling.

use thiserror::Error;

/// Errors raised while resolving, loading, or writing artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact with this id exists in the store.
    #[error("artifact not found: {file_id}")]
    NotFound { file_id: String },

    /// The id is not a plain file name.
    #[error("invalid artifact id: {file_id}")]
    InvalidFileId { file_id: String },

    /// The artifact is neither CSV nor Parquet.
    #[error("unsupported artifact format: {file_id}")]
    UnsupportedFormat { file_id: String },

    /// DuckDB failed to load or query the artifact.
    #[error("query store error: {0}")]
    Engine(#[from] duckdb::Error),

    /// Writing a delivery slip failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking query task did not complete.
    #[error("query task failed: {0}")]
    Task(String),
}
