//! Audit entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One audited tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry ID.
    pub event_id: Uuid,

    /// Caller identity.
    pub actor_id: String,

    /// Tool name.
    pub action: String,

    /// Artifact file id or SQL text.
    pub target: String,

    /// SQL text, when `target` is not already the query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    /// Why the caller needs the data.
    pub justification: String,

    /// When the call arrived.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry stamped with a fresh id and the current time.
    pub fn new(
        actor_id: impl Into<String>,
        action: impl Into<String>,
        target: impl Into<String>,
        justification: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            actor_id: actor_id.into(),
            action: action.into(),
            target: target.into(),
            sql: None,
            justification: justification.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}
