//! Ephemeral per-request query store.
//!
//! Every call opens a fresh in-memory DuckDB database, loads the artifact
//! into a table named `artifact`, disables external file access, runs one
//! query, and drops the database. Nothing is shared between calls.

use std::time::Instant;

use duckdb::Connection;
use duckdb::types::{TimeUnit, ValueRef};
use serde_json::{Number, Value};
use tracing::debug_span;
use warden_core::Row;

use crate::error::ArtifactError;
use crate::store::ArtifactFile;

/// Rows returned by an artifact query.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRows {
    /// Output column names, in select order.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

/// Result of running one query against an artifact.
#[derive(Debug, Clone)]
pub struct ArtifactQuery {
    /// Column headers of the artifact itself.
    pub headers: Vec<String>,
    /// Output of the query.
    pub result: ArtifactRows,
}

/// Runs queries against artifacts on a blocking thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactEngine;

impl ArtifactEngine {
    pub fn new() -> Self {
        Self
    }

    /// Load `file` and run `sql` against it.
    pub async fn query(
        &self,
        file: &ArtifactFile,
        sql: &str,
    ) -> Result<ArtifactQuery, ArtifactError> {
        let file = file.clone();
        let sql = sql.to_string();
        tokio::task::spawn_blocking(move || run_query(&file, &sql))
            .await
            .map_err(|e| ArtifactError::Task(e.to_string()))?
    }

    /// Column headers of `file`.
    pub async fn headers(&self, file: &ArtifactFile) -> Result<Vec<String>, ArtifactError> {
        let file = file.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_artifact(&file)?;
            artifact_headers(&conn)
        })
        .await
        .map_err(|e| ArtifactError::Task(e.to_string()))?
    }
}

fn run_query(file: &ArtifactFile, sql: &str) -> Result<ArtifactQuery, ArtifactError> {
    let conn = open_artifact(file)?;
    let headers = artifact_headers(&conn)?;
    let result = query_rows(&conn, sql)?;
    Ok(ArtifactQuery { headers, result })
}

fn open_artifact(file: &ArtifactFile) -> Result<Connection, ArtifactError> {
    let format = file.format()?;
    let span = debug_span!(
        "artifact.load",
        file_id = %file.file_id,
        format = %format,
        duration_ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();

    let conn = Connection::open_in_memory()?;
    let path = file.path.to_string_lossy().replace('\'', "''");
    conn.execute_batch(&format!(
        "CREATE TABLE artifact AS SELECT * FROM {}('{}');",
        format.reader(),
        path
    ))?;
    // The query itself must not reach any other file.
    conn.execute_batch("SET enable_external_access = false; SET lock_configuration = true;")?;

    span.record("duration_ms", start.elapsed().as_millis() as u64);
    Ok(conn)
}

fn artifact_headers(conn: &Connection) -> Result<Vec<String>, ArtifactError> {
    Ok(query_rows(conn, "SELECT * FROM artifact LIMIT 0")?.columns)
}

fn query_rows(conn: &Connection, sql: &str) -> Result<ArtifactRows, ArtifactError> {
    let span = debug_span!(
        "artifact.query",
        rows = tracing::field::Empty,
        duration_ms = tracing::field::Empty
    );
    let _guard = span.enter();
    let start = Instant::now();

    let mut stmt = conn.prepare(sql)?;
    let mut rows_iter = stmt.query([])?;

    let columns: Vec<String> = match rows_iter.as_ref() {
        Some(stmt_ref) => (0..stmt_ref.column_count())
            .map(|i| {
                stmt_ref
                    .column_name(i)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|_| format!("col{}", i))
            })
            .collect(),
        None => return Ok(ArtifactRows::default()),
    };

    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut record = Row::new();
        for (i, column) in columns.iter().enumerate() {
            record.insert(column.clone(), to_json(row.get_ref(i)?, i));
        }
        rows.push(record);
    }

    span.record("rows", rows.len());
    span.record("duration_ms", start.elapsed().as_millis() as u64);
    Ok(ArtifactRows { columns, rows })
}

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn to_json(value: ValueRef<'_>, index: usize) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(v) => Value::Bool(v),
        ValueRef::TinyInt(v) => Value::from(v),
        ValueRef::SmallInt(v) => Value::from(v),
        ValueRef::Int(v) => Value::from(v),
        ValueRef::BigInt(v) => Value::from(v),
        ValueRef::HugeInt(v) => match i64::try_from(v) {
            Ok(v) => Value::from(v),
            Err(_) => Value::String(v.to_string()),
        },
        ValueRef::UTinyInt(v) => Value::from(v),
        ValueRef::USmallInt(v) => Value::from(v),
        ValueRef::UInt(v) => Value::from(v),
        ValueRef::UBigInt(v) => Value::from(v),
        ValueRef::Float(v) => float(v as f64),
        ValueRef::Double(v) => float(v),
        ValueRef::Text(v) => Value::String(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::String(format!("<{} bytes>", v.len())),
        ValueRef::Timestamp(unit, v) => timestamp_json(unit, v),
        ValueRef::Date32(days) => date_json(days),
        ValueRef::Time64(unit, v) => time_json(unit, v),
        ValueRef::Interval {
            months,
            days,
            nanos,
        } => Value::String(format!("P{}M{}DT{}N", months, days, nanos)),
        other => {
            tracing::warn!(
                "DuckDB type {:?} at column {} mapped to debug string",
                std::mem::discriminant(&other),
                index
            );
            Value::String(format!("{:?}", other))
        }
    }
}

/// Out-of-range values (DuckDB `infinity` included) keep their raw number.
fn timestamp_json(unit: TimeUnit, value: i64) -> Value {
    to_micros(unit, value)
        .and_then(chrono::DateTime::from_timestamp_micros)
        .map(|dt| Value::String(dt.naive_utc().to_string()))
        .unwrap_or_else(|| Value::from(value))
}

fn date_json(days: i32) -> Value {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(chrono::NaiveDate::from_num_days_from_ce_opt)
        .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
        .unwrap_or_else(|| Value::from(days))
}

fn time_json(unit: TimeUnit, value: i64) -> Value {
    to_micros(unit, value)
        .and_then(|micros| {
            let secs = u32::try_from(micros / 1_000_000).ok()?;
            let nanos = u32::try_from((micros % 1_000_000) * 1_000).ok()?;
            chrono::NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
        })
        .map(|time| Value::String(time.format("%H:%M:%S%.6f").to_string()))
        .unwrap_or_else(|| Value::from(value))
}

fn to_micros(unit: TimeUnit, value: i64) -> Option<i64> {
    match unit {
        TimeUnit::Second => value.checked_mul(1_000_000),
        TimeUnit::Millisecond => value.checked_mul(1_000),
        TimeUnit::Microsecond => Some(value),
        TimeUnit::Nanosecond => Some(value / 1_000),
    }
}

fn float(v: f64) -> Value {
    Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}
