//! Infrastructure failures of a request.
//!
//! Policy outcomes never appear here; they are [`warden_core::Rejection`]
//! values returned inside `Ok`.

use thiserror::Error;
use warden_artifact::ArtifactError;
use warden_audit::AuditError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The audit entry could not be written, so the request is not served.
    #[error("audit log unavailable: {0}")]
    Audit(#[from] AuditError),

    #[error("artifact query failed: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("database query failed: {0:#}")]
    Database(anyhow::Error),
}
