use async_trait::async_trait;
use serde::Serialize;
use warden_core::{Row, TableReference};

/// A column as the live database reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[async_trait]
pub trait ReadOnlyDatabase: Send + Sync {
    /// Run one already-validated SELECT inside a read-only transaction.
    ///
    /// The connection is borrowed for this call only and released whether
    /// or not the query succeeds.
    async fn fetch(&self, sql: &str) -> anyhow::Result<Vec<Row>>;

    /// Columns of `table`, in ordinal order. Unknown tables yield no columns.
    async fn columns(&self, table: &TableReference) -> anyhow::Result<Vec<ColumnInfo>>;
}
