//! SQL parsing.

use crate::error::SqlError;
use sqlparser::ast::Statement;
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// Parses SQL text into statements.
pub struct SqlAnalyzer {
    dialect: PostgreSqlDialect,
}

impl Clone for SqlAnalyzer {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Default for SqlAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SqlAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlAnalyzer").finish()
    }
}

impl SqlAnalyzer {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse a SQL string into statements.
    pub fn parse(&self, sql: &str) -> Result<Vec<Statement>, SqlError> {
        Parser::parse_sql(&self.dialect, sql).map_err(|e| SqlError::ParseError(e.to_string()))
    }

    /// Leading keyword of a statement, e.g. `DELETE` or `CREATE`.
    pub fn statement_kind(&self, stmt: &Statement) -> String {
        leading_keyword(&stmt.to_string())
    }
}

/// First alphabetic word of rendered SQL, upper-cased.
pub(crate) fn leading_keyword(sql: &str) -> String {
    sql.split(|c: char| !c.is_ascii_alphabetic())
        .find(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "UNKNOWN".to_string())
}
