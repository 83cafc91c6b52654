//! Audit storage backends.

use crate::entry::AuditEntry;
use crate::error::AuditError;
use crate::logger::AuditFilter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Trait for audit storage backends.
///
/// Backends only append; there is deliberately no update or delete.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Append an entry.
    async fn store(&self, entry: &AuditEntry) -> Result<(), AuditError>;

    /// Read back stored entries matching `filter`, oldest first.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError>;
}

/// Console storage (writes JSON to stderr).
///
/// Stdout belongs to the stdio transport, so nothing is printed there.
#[derive(Debug, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let json = serde_json::to_string(entry)?;
        eprintln!("{}", json);
        Ok(())
    }

    async fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        // Console output is not retained
        Ok(vec![])
    }
}

/// JSON Lines file storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                AuditError::WriteFailed(format!("cannot open {}: {}", self.path.display(), e))
            })?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => {
                return Err(AuditError::QueryFailed(format!(
                    "cannot read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let entries = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(index, line)| match serde_json::from_str::<AuditEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(line = index + 1, error = %e, "skipping malformed audit line");
                    None
                }
            });

        Ok(filter.apply(entries))
    }
}

/// File storage mirrored to the console.
#[derive(Debug)]
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: FileStorage::new(path),
            console: ConsoleStorage,
        }
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        self.file.store(entry).await?;
        self.console.store(entry).await
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        self.file.query(filter).await
    }
}

/// In-memory storage, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything stored so far.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| AuditError::WriteFailed(format!("Failed to acquire write lock: {}", e)))?;
        entries.push(entry.clone());
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| AuditError::QueryFailed(format!("Failed to acquire read lock: {}", e)))?;
        Ok(filter.apply(entries.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(action: &str, target: &str) -> AuditEntry {
        AuditEntry::new("mcp_agent", action, target, "Investigating a customer complaint")
    }

    #[tokio::test]
    async fn test_console_storage() {
        let storage = ConsoleStorage::new();
        storage.store(&entry("read_query", "SELECT 1")).await.unwrap();
        assert!(storage.query(&AuditFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let storage = FileStorage::new(&path);

        storage.store(&entry("read_query", "SELECT 1")).await.unwrap();
        storage.store(&entry("analyze_artifact", "sales.csv")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let all = storage.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].action, "read_query");

        let filter = AuditFilter {
            action: Some("analyze_artifact".to_string()),
            ..Default::default()
        };
        let artifacts = storage.query(&filter).await.unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].target, "sales.csv");
    }

    #[tokio::test]
    async fn test_file_storage_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let storage = FileStorage::new(&path);
        storage.store(&entry("read_query", "SELECT 1")).await.unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"not json\n"))
            .unwrap();

        let all = storage.query(&AuditFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_file_storage_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.log"));
        assert!(storage.query(&AuditFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_storage_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("missing").join("audit.log"));
        let result = storage.store(&entry("read_query", "SELECT 1")).await;
        assert!(matches!(result, Err(AuditError::WriteFailed(_))));
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        storage.store(&entry("read_query", "a")).await.unwrap();
        storage.store(&entry("read_query", "b")).await.unwrap();
        storage.store(&entry("read_query", "c")).await.unwrap();

        let filter = AuditFilter {
            limit: Some(2),
            ..Default::default()
        };
        let latest = storage.query(&filter).await.unwrap();
        let targets: Vec<_> = latest.iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert_eq!(storage.entries().len(), 3);
    }
}
