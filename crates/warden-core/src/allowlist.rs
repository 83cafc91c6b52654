//! Schema allowlist store.
//!
//! The policy document maps `schema → table → column → { description }`.
//! It is parsed into strongly-typed maps once at startup; every name is
//! lower-cased so lookups are case-insensitive. A table entry with no
//! columns is a structural error, not an empty grant.

use crate::config::ConfigError;
use crate::table::TableReference;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

const ROOT_KEY: &str = "allowlist";

/// Policy attached to a single allowed column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPolicy {
    /// Human-readable description, surfaced in hints and schema listings.
    #[serde(default)]
    pub description: String,
}

/// Allowed columns of one table, keyed by lower-cased column name.
pub type TablePolicy = BTreeMap<String, ColumnPolicy>;

type RawTables = BTreeMap<String, BTreeMap<String, Option<ColumnPolicy>>>;

/// The loaded allowlist. Immutable for the lifetime of the process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowlistConfig {
    schemas: BTreeMap<String, BTreeMap<String, TablePolicy>>,
}

impl AllowlistConfig {
    /// Load the policy document from a YAML file.
    ///
    /// A missing file, a missing `allowlist` root key or a table with an
    /// empty column map all fail.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::PolicyNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse the policy document from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        let root = document
            .as_mapping()
            .and_then(|m| m.get(ROOT_KEY))
            .ok_or_else(|| {
                ConfigError::Config(format!("policy document is missing its root `{ROOT_KEY}` key"))
            })?;

        let raw: BTreeMap<String, RawTables> = serde_yaml::from_value(root.clone())?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: BTreeMap<String, RawTables>) -> Result<Self, ConfigError> {
        let mut schemas: BTreeMap<String, BTreeMap<String, TablePolicy>> = BTreeMap::new();

        for (schema, tables) in raw {
            let schema = schema.to_lowercase();
            let entry = schemas.entry(schema.clone()).or_default();

            for (table, columns) in tables {
                let table = table.to_lowercase();
                if columns.is_empty() {
                    return Err(ConfigError::Config(format!(
                        "allowlist table `{schema}.{table}` has no columns"
                    )));
                }
                let columns: TablePolicy = columns
                    .into_iter()
                    .map(|(name, policy)| (name.to_lowercase(), policy.unwrap_or_default()))
                    .collect();
                entry.insert(table, columns);
            }
        }

        Ok(Self { schemas })
    }

    /// Build an allowlist in code. Names are normalized like a loaded document.
    pub fn builder() -> AllowlistBuilder {
        AllowlistBuilder::default()
    }

    /// Column policy for a schema-qualified table. Unqualified references
    /// never match.
    pub fn lookup(&self, table: &TableReference) -> Option<&TablePolicy> {
        let schema = table.schema.as_deref()?;
        self.schemas.get(schema)?.get(&table.name)
    }

    /// Whether `table` has an allowlist entry.
    pub fn contains(&self, table: &TableReference) -> bool {
        self.lookup(table).is_some()
    }

    /// Union of the allowed columns of every referenced table that has an
    /// entry. `None` when no referenced table has one.
    pub fn merge_allowlists<'a>(
        &self,
        tables: impl IntoIterator<Item = &'a TableReference>,
    ) -> Option<ColumnSet> {
        let mut merged = ColumnSet::default();
        let mut found = false;

        for table in tables {
            if let Some(columns) = self.lookup(table) {
                found = true;
                merged.extend(columns.keys().cloned());
            }
        }

        found.then_some(merged)
    }

    /// Every table entry with its column policy, in lexical order.
    pub fn tables(&self) -> impl Iterator<Item = (TableReference, &TablePolicy)> {
        self.schemas.iter().flat_map(|(schema, tables)| {
            tables
                .iter()
                .map(move |(name, columns)| (TableReference::qualified(schema, name), columns))
        })
    }

    /// `schema.table` names of every entry, for hints.
    pub fn table_names(&self) -> Vec<String> {
        self.tables().map(|(table, _)| table.to_string()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.values().all(|tables| tables.is_empty())
    }
}

/// Programmatic construction of an [`AllowlistConfig`].
#[derive(Debug, Default)]
pub struct AllowlistBuilder {
    raw: BTreeMap<String, RawTables>,
}

impl AllowlistBuilder {
    /// Allow `columns` of `schema.table`, each given as `(name, description)`.
    pub fn table(mut self, schema: &str, table: &str, columns: &[(&str, &str)]) -> Self {
        let entry = self
            .raw
            .entry(schema.to_string())
            .or_default()
            .entry(table.to_string())
            .or_default();
        for (name, description) in columns {
            entry.insert(
                name.to_string(),
                Some(ColumnPolicy {
                    description: description.to_string(),
                }),
            );
        }
        self
    }

    pub fn build(self) -> Result<AllowlistConfig, ConfigError> {
        AllowlistConfig::from_raw(self.raw)
    }
}

/// A set of allowed column names. Membership is case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSet(BTreeSet<String>);

impl ColumnSet {
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(&column.to_lowercase())
    }

    pub fn insert(&mut self, column: impl Into<String>) {
        self.0.insert(column.into().to_lowercase());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Extend<String> for ColumnSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for column in iter {
            self.insert(column);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::default();
        for column in iter {
            set.insert(column);
        }
        set
    }
}

impl From<&TablePolicy> for ColumnSet {
    fn from(policy: &TablePolicy) -> Self {
        policy.keys().cloned().collect()
    }
}
