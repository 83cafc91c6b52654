//! Artifact storage.
//!
//! Artifacts are flat files in a single directory, addressed by file name.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use warden_core::Row;

use crate::error::ArtifactError;

/// Tabular formats the query store can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    Csv,
    Parquet,
}

impl ArtifactFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Some(Self::Csv),
            "parquet" => Some(Self::Parquet),
            _ => None,
        }
    }

    /// DuckDB table function that reads this format.
    pub fn reader(&self) -> &'static str {
        match self {
            Self::Csv => "read_csv_auto",
            Self::Parquet => "read_parquet",
        }
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Parquet => write!(f, "parquet"),
        }
    }
}

/// An artifact that exists on disk.
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    pub file_id: String,
    pub path: PathBuf,
}

impl ArtifactFile {
    pub fn format(&self) -> Result<ArtifactFormat, ArtifactError> {
        ArtifactFormat::detect(&self.path).ok_or_else(|| ArtifactError::UnsupportedFormat {
            file_id: self.file_id.clone(),
        })
    }
}

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `file_id` to an existing artifact.
    ///
    /// Ids must be plain file names; anything that could escape the store
    /// directory is refused.
    pub fn resolve(&self, file_id: &str) -> Result<ArtifactFile, ArtifactError> {
        if !is_plain_file_name(file_id) {
            return Err(ArtifactError::InvalidFileId {
                file_id: file_id.to_string(),
            });
        }

        let path = self.root.join(file_id);
        if !path.is_file() {
            return Err(ArtifactError::NotFound {
                file_id: file_id.to_string(),
            });
        }

        Ok(ArtifactFile {
            file_id: file_id.to_string(),
            path,
        })
    }

    /// Write an overflowing result as a new CSV artifact and return its id.
    pub fn write_slip(&self, columns: &[String], rows: &[Row]) -> Result<String, ArtifactError> {
        let file_id = format!("result_{}.csv", uuid::Uuid::new_v4());
        let path = self.root.join(&file_id);

        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(columns)?;
        for row in rows {
            writer.write_record(columns.iter().map(|column| csv_field(row.get(column))))?;
        }
        writer.flush()?;

        tracing::info!(file_id = %file_id, rows = rows.len(), "wrote delivery slip");
        Ok(file_id)
    }
}

fn is_plain_file_name(file_id: &str) -> bool {
    !file_id.is_empty()
        && file_id != "."
        && file_id != ".."
        && !file_id.contains(['/', '\\', '\0'])
}

fn csv_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
