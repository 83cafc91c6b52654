//! Dynamic row-limit safety governor.
//!
//! A row's cost is estimated at four characters per token over its non-null
//! fields. The first row of a result stands in for all of them, so the
//! decision is a heuristic rather than an exact bound.

use serde::Serialize;
use serde_json::Value;
use warden_core::{GovernorConfig, Row};

const CHARS_PER_TOKEN: u64 = 4;

/// How many rows of a result may be returned inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowLimitDecision {
    /// Always at least 1.
    pub allowed_rows: u64,
    /// Estimated tokens of the sampled row.
    pub tokens_per_row: u64,
}

impl RowLimitDecision {
    /// Whether a result of `rows` rows fits.
    pub fn permits(&self, rows: usize) -> bool {
        rows as u64 <= self.allowed_rows
    }
}

/// Computes per-query row limits from a sampled row.
#[derive(Debug, Clone)]
pub struct RowLimitGovernor {
    token_budget: u64,
    reserve_ratio: f64,
}

impl Default for RowLimitGovernor {
    fn default() -> Self {
        Self::new(&GovernorConfig::default())
    }
}

impl RowLimitGovernor {
    pub fn new(config: &GovernorConfig) -> Self {
        Self {
            token_budget: config.token_budget,
            reserve_ratio: config.reserve_ratio,
        }
    }

    /// Budget left once the overhead reserve is taken out.
    pub fn available_tokens(&self) -> u64 {
        let reserved = (self.token_budget as f64 * self.reserve_ratio).floor() as u64;
        self.token_budget.saturating_sub(reserved)
    }

    /// Estimated token cost of one row.
    pub fn estimate_row_tokens(row: &Row) -> u64 {
        row.values().map(estimate_value_tokens).sum()
    }

    /// Row limit for a result whose first row is `sample`.
    pub fn row_limit(&self, sample: &Row) -> RowLimitDecision {
        let tokens_per_row = Self::estimate_row_tokens(sample).max(1);
        let allowed_rows = (self.available_tokens() / tokens_per_row).max(1);

        tracing::debug!(tokens_per_row, allowed_rows, "computed row limit");
        RowLimitDecision {
            allowed_rows,
            tokens_per_row,
        }
    }
}

/// Length is counted in UTF-16 code units.
fn estimate_value_tokens(value: &Value) -> u64 {
    let chars = match value {
        Value::Null => return 0,
        Value::String(s) => s.encode_utf16().count(),
        other => other.to_string().encode_utf16().count(),
    } as u64;
    chars.div_ceil(CHARS_PER_TOKEN)
}
