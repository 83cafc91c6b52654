//! Warden result policy enforcement.
//!
//! Everything here runs after a query has been validated and executed:
//!
//! - [`RowLimitGovernor`] sizes a result against the consuming model's token budget
//! - [`ColumnFilter`] strips every field that is not allowlisted
//! - [`identify`] matches an artifact's headers to the allowlist table it came from

pub mod filter;
pub mod fingerprint;
pub mod governor;

pub use filter::{AGGREGATE_OUTPUT_NAMES, ColumnFilter};
pub use fingerprint::{FingerprintMatch, identify};
pub use governor::{RowLimitDecision, RowLimitGovernor};
