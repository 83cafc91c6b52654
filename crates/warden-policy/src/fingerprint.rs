//! Artifact schema fingerprinting.
//!
//! A delivered artifact carries no record of the query that produced it, so
//! its policy is recovered from its column headers: the allowlist table
//! sharing the most column names wins. Ties and zero overlap identify
//! nothing.

use std::collections::BTreeSet;

use serde::Serialize;
use warden_core::{AllowlistConfig, ColumnSet, TableReference};

/// A table identified from artifact headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintMatch {
    pub table: TableReference,
    /// Number of distinct headers found in the table's columns.
    pub score: usize,
}

/// Identifies the allowlist table an artifact's `headers` came from.
pub fn identify<S: AsRef<str>>(
    headers: &[S],
    allowlist: &AllowlistConfig,
) -> Option<FingerprintMatch> {
    let headers: BTreeSet<String> = headers
        .iter()
        .map(|header| header.as_ref().trim().to_lowercase())
        .filter(|header| !header.is_empty())
        .collect();

    let mut best: Option<FingerprintMatch> = None;
    let mut tied = false;

    for (table, policy) in allowlist.tables() {
        let columns = ColumnSet::from(policy);
        let score = headers
            .iter()
            .filter(|header| columns.contains(header))
            .count();
        if score == 0 {
            continue;
        }

        match &best {
            Some(current) if score < current.score => {}
            Some(current) if score == current.score => tied = true,
            _ => {
                best = Some(FingerprintMatch { table, score });
                tied = false;
            }
        }
    }

    match best {
        Some(found) if tied => {
            tracing::debug!(score = found.score, "artifact fingerprint is ambiguous");
            None
        }
        Some(found) => {
            tracing::debug!(table = %found.table, score = found.score, "artifact fingerprint matched");
            Some(found)
        }
        None => None,
    }
}
