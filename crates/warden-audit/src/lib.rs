//! # warden-audit
//!
//! Append-only audit trail for Warden tool calls.
//!
//! One [`AuditEntry`] is written per tool invocation, before the query is
//! validated, so that rejected attempts are recorded alongside accepted ones.
//! Entries are never updated or deleted.
//!
//! ## Entry Format
//!
//! - **File output**: JSON Lines (one JSON object per line)
//! - **Console output**: the same JSON, written to stderr
//!
//! | Field | Description |
//! |-------|-------------|
//! | `event_id` | Unique id of the entry |
//! | `actor_id` | Who issued the call (`mcp_agent` by default) |
//! | `action` | Tool name (`analyze_artifact`, `read_query`) |
//! | `target` | Artifact file id, or the SQL text for database queries |
//! | `sql` | SQL text for artifact queries |
//! | `justification` | Caller-supplied reason for the access |
//! | `timestamp` | RFC 3339 time of the call |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use warden_audit::AuditLogger;
//! use warden_core::AuditConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let logger = AuditLogger::new(AuditConfig::default());
//!
//! logger
//!     .log_read_query(
//!         "SELECT id FROM app_data.users LIMIT 10",
//!         "Counting recent signups for the weekly report",
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod entry;
pub mod error;
pub mod logger;
pub mod storage;

pub use entry::AuditEntry;
pub use error::AuditError;
pub use logger::{AuditFilter, AuditLogger};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage};
