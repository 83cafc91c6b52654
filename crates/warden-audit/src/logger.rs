//! Audit logger implementation.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use warden_core::AuditConfig;

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::storage::{AuditStorage, DualStorage, FileStorage};

/// Filters for reading the audit trail back.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub action: Option<String>,
    pub actor_id: Option<String>,
    /// Only entries at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent `limit` matches.
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(action) = &self.action
            && &entry.action != action
        {
            return false;
        }
        if let Some(actor) = &self.actor_id
            && &entry.actor_id != actor
        {
            return false;
        }
        if let Some(since) = self.since
            && entry.timestamp < since
        {
            return false;
        }
        true
    }

    /// Apply the filter to entries given oldest first.
    pub fn apply(&self, entries: impl IntoIterator<Item = AuditEntry>) -> Vec<AuditEntry> {
        let mut matched: Vec<AuditEntry> = entries.into_iter().filter(|e| self.matches(e)).collect();
        if let Some(limit) = self.limit
            && matched.len() > limit
        {
            matched.drain(..matched.len() - limit);
        }
        matched
    }
}

/// Writes one entry per tool invocation.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a logger writing to `config.file`, mirrored to stderr when
    /// `config.stdout` is set.
    pub fn new(config: AuditConfig) -> Self {
        let path = config.file.clone();
        Self::with_path(config, path)
    }

    /// Same as [`AuditLogger::new`] but writing to an already resolved path.
    pub fn with_path(config: AuditConfig, path: PathBuf) -> Self {
        let storage: Arc<dyn AuditStorage> = if config.stdout {
            Arc::new(DualStorage::new(path))
        } else {
            Arc::new(FileStorage::new(path))
        };
        Self { config, storage }
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    pub fn actor(&self) -> &str {
        &self.config.actor
    }

    /// Append an entry.
    pub async fn log(&self, entry: AuditEntry) -> Result<AuditEntry, AuditError> {
        tracing::debug!(
            event_id = %entry.event_id,
            actor = %entry.actor_id,
            action = %entry.action,
            target = %entry.target,
            "Audit entry"
        );

        self.storage.store(&entry).await?;
        Ok(entry)
    }

    /// Record an `analyze_artifact` call.
    pub async fn log_analyze_artifact(
        &self,
        file_id: &str,
        sql: &str,
        justification: &str,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::new(self.actor(), "analyze_artifact", file_id, justification)
            .with_sql(sql);
        self.log(entry).await
    }

    /// Record a `read_query` call.
    pub async fn log_read_query(
        &self,
        sql: &str,
        justification: &str,
    ) -> Result<AuditEntry, AuditError> {
        let entry = AuditEntry::new(self.actor(), "read_query", sql, justification);
        self.log(entry).await
    }

    /// Read back entries.
    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        self.storage.query(filter).await
    }
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
