//! Error types for the SQL crate.

use thiserror::Error;

/// Errors raised while parsing or walking a statement.
#[derive(Debug, Error)]
pub enum SqlError {
    /// SQL parsing failed.
    #[error("failed to parse SQL: {0}")]
    ParseError(String),

    /// A relation was named without a schema under the strict policy.
    #[error("unqualified table reference `{name}`; fully qualified schema.table is required")]
    UnqualifiedTable { name: String },

    /// A relation name the extractor cannot resolve to `schema.table`.
    #[error("unsupported table reference `{name}`")]
    UnsupportedReference { name: String },

    /// A FROM item that is not a plain table, subquery or join.
    #[error("unsupported table source in FROM clause: {detail}")]
    UnsupportedTableSource { detail: String },
}
