//! Table references extracted from queries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A relation named by a query.
///
/// Both parts are lower-cased on construction so that allowlist matching is
/// case-insensitive. Ordering is lexical on `(schema, name)` which keeps
/// extracted sets deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableReference {
    /// Schema qualifier, if the query supplied one.
    pub schema: Option<String>,
    /// Relation name.
    pub name: String,
}

impl TableReference {
    /// Create a reference, normalizing both parts.
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        Self {
            schema: schema.map(str::to_lowercase),
            name: name.to_lowercase(),
        }
    }

    /// A schema-qualified reference.
    pub fn qualified(schema: &str, name: &str) -> Self {
        Self::new(Some(schema), name)
    }

    /// A reference without a schema qualifier.
    pub fn bare(name: &str) -> Self {
        Self::new(None, name)
    }

    /// Whether the query named a schema for this relation.
    pub fn is_qualified(&self) -> bool {
        self.schema.is_some()
    }

    /// Fill in `schema` when the reference has no qualifier.
    pub fn qualify_with(self, schema: &str) -> Self {
        match self.schema {
            Some(_) => self,
            None => Self {
                schema: Some(schema.to_lowercase()),
                name: self.name,
            },
        }
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
