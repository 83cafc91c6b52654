//! # warden-core
//!
//! Types shared by every Warden crate:
//!
//! - [`WardenConfig`]: the gateway configuration loaded from `warden.yaml`
//! - [`AllowlistConfig`]: the schema → table → column policy document
//! - [`TableReference`]: a relation named by a query, normalized for comparison
//! - [`Rejection`] / [`SafetyDecision`]: the verdict of a validation pass
//!
//! ## Policy document
//!
//! ```yaml
//! allowlist:
//!   app_data:
//!     users:
//!       id: { description: "Primary key" }
//!       email: { description: "Contact address" }
//!     orders:
//!       id: { description: "Order id" }
//!       total: { description: "Order total in cents" }
//! ```
//!
//! Anything not listed is denied.

pub mod allowlist;
pub mod config;
pub mod decision;
pub mod table;

pub use allowlist::{AllowlistConfig, ColumnPolicy, ColumnSet, TablePolicy};
pub use config::{
    ArtifactsConfig, AuditConfig, ConfigError, GovernorConfig, McpConfig, SchemaPolicyMode,
    Transport, UpstreamConfig, ValidationConfig, WardenConfig,
};
pub use decision::{QueryMode, Rejection, RejectionKind, SafetyDecision};
pub use table::TableReference;

/// One result row, keyed by output column name.
pub type Row = serde_json::Map<String, serde_json::Value>;
