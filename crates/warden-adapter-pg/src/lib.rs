//! PostgreSQL implementation of [`ReadOnlyDatabase`].
//!
//! Every query borrows one pooled connection, opens a transaction, marks it
//! `READ ONLY`, runs, and rolls back. Rows come back as JSON objects built
//! server-side with `row_to_json`, so every Postgres type has a faithful
//! JSON rendering.

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row as _;
use std::time::Duration;
use warden_core::{Row, TableReference, UpstreamConfig};
use warden_runtime::{ColumnInfo, ReadOnlyDatabase};

pub struct PgDatabase {
    pool: PgPool,
    statement_timeout_ms: Option<u64>,
    default_schema: String,
}

impl PgDatabase {
    /// Build a pool that connects on first use.
    ///
    /// `default_schema` becomes the transaction's `search_path`, so bare
    /// names resolve to the same schema they were validated against.
    pub fn connect_lazy(config: &UpstreamConfig, default_schema: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool.max_connections)
            .acquire_timeout(Duration::from_secs(config.pool.acquire_timeout_seconds))
            .connect_lazy(&config.connection_string())
            .context("invalid database connection string")?;

        Ok(Self::from_pool(pool, config.statement_timeout_ms, default_schema))
    }

    pub fn from_pool(pool: PgPool, statement_timeout_ms: Option<u64>, default_schema: &str) -> Self {
        Self {
            pool,
            statement_timeout_ms,
            default_schema: default_schema.to_string(),
        }
    }

    /// Check that a connection can be established.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("database is unreachable")?;
        Ok(())
    }
}

#[async_trait]
impl ReadOnlyDatabase for PgDatabase {
    async fn fetch(&self, sql: &str) -> anyhow::Result<Vec<Row>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to acquire a database connection")?;

        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query("SELECT set_config('search_path', $1, true)")
            .bind(quote_ident(&self.default_schema))
            .execute(&mut *tx)
            .await?;
        if let Some(timeout) = self.statement_timeout_ms {
            sqlx::query(&format!("SET LOCAL statement_timeout = {}", timeout))
                .execute(&mut *tx)
                .await?;
        }

        let wrapped = wrap_query(sql);
        let result = sqlx::query(&wrapped).fetch_all(&mut *tx).await;

        // Nothing is ever committed.
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "rollback of read-only transaction failed");
        }

        let rows = result.context("query failed")?;
        rows.iter().map(row_to_json).collect()
    }

    async fn columns(&self, table: &TableReference) -> anyhow::Result<Vec<ColumnInfo>> {
        let schema = table.schema.as_deref().unwrap_or(&self.default_schema);

        let rows = sqlx::query(
            r#"
            select column_name, data_type
            from information_schema.columns
            where table_schema = $1 and table_name = $2
            order by ordinal_position
            "#,
        )
        .bind(schema)
        .bind(&table.name)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to read columns of {}", table))?;

        rows.iter()
            .map(|row| -> anyhow::Result<ColumnInfo> {
                Ok(ColumnInfo {
                    name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                })
            })
            .collect()
    }
}

/// Wrap a validated SELECT so each result row arrives as one JSON object.
fn wrap_query(sql: &str) -> String {
    let body = sql.trim().trim_end_matches(';').trim_end();
    format!("SELECT row_to_json(q) FROM (\n{}\n) AS q", body)
}

fn row_to_json(row: &PgRow) -> anyhow::Result<Row> {
    match row.try_get::<Value, _>(0)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("expected a JSON object row, got {}", other),
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
