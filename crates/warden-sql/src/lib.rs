//! # warden-sql
//!
//! SQL parsing and policy validation for Warden.
//!
//! This crate provides functionality to:
//! - Parse untrusted SQL with `sqlparser` (PostgreSQL dialect)
//! - Extract every table a statement touches, including tables inside
//!   subqueries, CTEs and join trees
//! - Validate a statement against the allowlist before anything executes
//!
//! ## Validation steps
//!
//! | Step | Check | Rejection |
//! |------|-------|-----------|
//! | 1 | Parse | `InvalidSyntax` |
//! | 2 | Exactly one statement | `BatchNotAllowed` |
//! | 3 | Read-only `SELECT`, no forbidden functions | `ForbiddenStatementType` |
//! | 4 | Table extraction | `ExtractionFailed` |
//! | 5 | Tables in scope | `OutOfScopeTable` / `TableNotAllowed` |
//! | 6 | Every join has `ON` (database mode) | `ImplicitJoinRejected` |
//! | 7 | `LIMIT` unless pure aggregate | `LimitRequired` |
//!
//! Validation is pure: it reads only the query text and the loaded
//! allowlist, so a single [`SqlValidator`] can be shared across threads.

pub mod error;
pub mod extractor;
pub mod parser;
pub mod validator;

pub use error::SqlError;
pub use extractor::{SchemaPolicy, extract_tables};
pub use parser::SqlAnalyzer;
pub use validator::{ARTIFACT_TABLE, SqlValidator, ValidatedQuery};
