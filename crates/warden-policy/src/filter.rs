//! Column-level output filtering.

use warden_core::{ColumnSet, Row};

/// Output names kept even when they are not allowlisted columns, so that
/// aggregate results survive filtering.
pub const AGGREGATE_OUTPUT_NAMES: &[&str] = &[
    "count",
    "sum",
    "avg",
    "min",
    "max",
    "total",
    "total_revenue",
];

/// Removes every field whose name is neither an allowed column nor a known
/// aggregate output name. Matching is case-insensitive.
///
/// Renaming a restricted column to an allowed name (`SELECT secret AS id`)
/// is not detected here.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    allowed: ColumnSet,
}

impl ColumnFilter {
    pub fn new(allowed: ColumnSet) -> Self {
        Self { allowed }
    }

    pub fn allowed(&self) -> &ColumnSet {
        &self.allowed
    }

    /// Whether a field named `key` may be returned.
    pub fn permits(&self, key: &str) -> bool {
        self.allowed.contains(key)
            || AGGREGATE_OUTPUT_NAMES
                .iter()
                .any(|name| name.eq_ignore_ascii_case(key))
    }

    pub fn filter_row(&self, row: Row) -> Row {
        row.into_iter().filter(|(key, _)| self.permits(key)).collect()
    }

    /// Filters every row. Row count and order are preserved.
    pub fn filter_rows(&self, rows: Vec<Row>) -> Vec<Row> {
        let before = rows.first().map(|row| row.len()).unwrap_or(0);
        let filtered: Vec<Row> = rows.into_iter().map(|row| self.filter_row(row)).collect();

        if let Some(first) = filtered.first()
            && first.len() < before
        {
            tracing::debug!(
                removed = before - first.len(),
                "column filter removed restricted fields"
            );
        }
        filtered
    }
}
