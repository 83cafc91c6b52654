//! Successful result shapes returned to callers.

use serde::Serialize;
use warden_core::Row;

pub const SLIP_NOTE: &str = "Result exceeds safe token limits. Use analyze_artifact on the slip";

/// Rows returned inline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRows {
    pub rows: usize,
    pub data: Vec<Row>,
}

impl QueryRows {
    pub fn new(data: Vec<Row>) -> Self {
        Self {
            rows: data.len(),
            data,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// Reference to an overflowing result written back as a new artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliverySlip {
    pub file_id: String,
    pub rows: usize,
    pub allowed_rows: u64,
    pub note: String,
}

/// Outcome of an accepted artifact query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArtifactOutcome {
    Rows(QueryRows),
    Slip { delivery_slip: DeliverySlip },
}

/// One allowlisted column as it exists in the live database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
    pub description: String,
}

/// Safe view of one allowlisted table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDescription {
    pub table: String,
    pub columns: Vec<ColumnDescription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_shapes() {
        let rows = ArtifactOutcome::Rows(QueryRows::empty());
        assert_eq!(serde_json::to_value(&rows).unwrap(), json!({ "rows": 0, "data": [] }));

        let slip = ArtifactOutcome::Slip {
            delivery_slip: DeliverySlip {
                file_id: "result_1.csv".to_string(),
                rows: 10,
                allowed_rows: 2,
                note: SLIP_NOTE.to_string(),
            },
        };
        assert_eq!(
            serde_json::to_value(&slip).unwrap(),
            json!({
                "delivery_slip": {
                    "file_id": "result_1.csv",
                    "rows": 10,
                    "allowed_rows": 2,
                    "note": SLIP_NOTE,
                }
            })
        );
    }
}
