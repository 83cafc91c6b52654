#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use warden_audit::{AuditEntry, AuditError, AuditFilter, AuditLogger, AuditStorage, MemoryStorage};
use warden_core::{AllowlistConfig, AuditConfig, Row, TableReference, WardenConfig};
use warden_runtime::{ColumnInfo, Orchestrator, ReadOnlyDatabase};

pub const JUSTIFICATION: &str = "Reviewing order volume for the quarterly report";

pub fn allowlist() -> AllowlistConfig {
    AllowlistConfig::builder()
        .table(
            "app_data",
            "users",
            &[
                ("id", "Primary key"),
                ("email", "Contact address"),
                ("created_at", "Signup time"),
            ],
        )
        .table(
            "app_data",
            "orders",
            &[
                ("id", "Order id"),
                ("total", "Order total in cents"),
                ("status", "Fulfilment status"),
            ],
        )
        .build()
        .unwrap()
}

pub fn row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => panic!("rows must be objects"),
    }
}

/// In-process database that records every connection it hands out.
#[derive(Default)]
pub struct MockDatabase {
    pub rows: Vec<Row>,
    pub columns: HashMap<String, Vec<ColumnInfo>>,
    pub fail: bool,
    fetches: AtomicUsize,
}

impl MockDatabase {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadOnlyDatabase for MockDatabase {
    async fn fetch(&self, _sql: &str) -> anyhow::Result<Vec<Row>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("connection refused");
        }
        Ok(self.rows.clone())
    }

    async fn columns(&self, table: &TableReference) -> anyhow::Result<Vec<ColumnInfo>> {
        Ok(self
            .columns
            .get(&table.to_string())
            .cloned()
            .unwrap_or_default())
    }
}

/// Storage whose writes always fail.
pub struct BrokenStorage;

#[async_trait]
impl AuditStorage for BrokenStorage {
    async fn store(&self, _entry: &AuditEntry) -> Result<(), AuditError> {
        Err(AuditError::WriteFailed("disk full".to_string()))
    }

    async fn query(&self, _filter: &AuditFilter) -> Result<Vec<AuditEntry>, AuditError> {
        Ok(vec![])
    }
}

pub struct Fixture {
    pub dir: TempDir,
    pub audit: Arc<MemoryStorage>,
    pub db: Arc<MockDatabase>,
    pub orchestrator: Orchestrator,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_db(MockDatabase::default())
    }

    pub fn with_db(db: MockDatabase) -> Self {
        let audit = Arc::new(MemoryStorage::new());
        Self::build(db, audit.clone(), audit)
    }

    pub fn with_broken_audit() -> Self {
        Self::build(
            MockDatabase::default(),
            Arc::new(MemoryStorage::new()),
            Arc::new(BrokenStorage),
        )
    }

    fn build(
        db: MockDatabase,
        audit: Arc<MemoryStorage>,
        storage: Arc<dyn AuditStorage>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = WardenConfig::default();
        config.artifacts.directory = dir.path().to_path_buf();

        let db = Arc::new(db);
        let logger = Arc::new(AuditLogger::with_storage(AuditConfig::default(), storage));
        let orchestrator = Orchestrator::new(&config, Arc::new(allowlist()), logger, db.clone());

        Self {
            dir,
            audit,
            db,
            orchestrator,
        }
    }

    pub fn write_artifact(&self, name: &str, content: &str) {
        std::fs::write(self.dir.path().join(name), content).unwrap();
    }

    pub fn read_artifact(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap()
    }
}
