//! Validation verdicts and the rejection taxonomy.
//!
//! A rejection is an expected outcome, not an error: it is returned as a
//! value and surfaced to the caller as `{ error, hint, category }`.
//! Infrastructure faults travel through each crate's error type instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which target a query is validated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// An uploaded file exposed as the single table `artifact`.
    Artifact,
    /// The live database, restricted to allowlisted tables.
    Database,
}

impl fmt::Display for QueryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact => write!(f, "artifact"),
            Self::Database => write!(f, "database"),
        }
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionKind {
    InvalidSyntax,
    BatchNotAllowed,
    ForbiddenStatementType,
    OutOfScopeTable,
    TableNotAllowed,
    ImplicitJoinRejected,
    LimitRequired,
    ExtractionFailed,
    ArtifactNotFound,
    UnsupportedFileFormat,
    SchemaIdentificationFailed,
    ResultTooLarge,
    PolicyMissing,
    InternalAllowlistLookupFailure,
}

impl RejectionKind {
    /// Response category reported to the caller.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidSyntax
            | Self::BatchNotAllowed
            | Self::ForbiddenStatementType
            | Self::OutOfScopeTable
            | Self::TableNotAllowed
            | Self::ImplicitJoinRejected
            | Self::LimitRequired
            | Self::ExtractionFailed => "SQL_VALIDATION_ERROR",
            Self::ArtifactNotFound
            | Self::UnsupportedFileFormat
            | Self::SchemaIdentificationFailed => "ARTIFACT_ERROR",
            Self::ResultTooLarge => "RESULT_TOO_LARGE",
            Self::PolicyMissing | Self::InternalAllowlistLookupFailure => "POLICY_ERROR",
        }
    }

    /// Hint used when the rejecting step has nothing more specific to say.
    pub fn default_hint(&self) -> &'static str {
        match self {
            Self::InvalidSyntax => "Check the query for syntax errors",
            Self::BatchNotAllowed => "Split your logic into multiple queries",
            Self::ForbiddenStatementType => "Only SELECT queries are allowed",
            Self::OutOfScopeTable => "Remove references to other tables",
            Self::TableNotAllowed => "Query only allowlisted tables",
            Self::ImplicitJoinRejected => "Add ON to all JOIN statements",
            Self::LimitRequired => "Add LIMIT 100 or similar",
            Self::ExtractionFailed => "Simplify the table references in the query",
            Self::ArtifactNotFound => "Invalid file_id",
            Self::UnsupportedFileFormat => "Only CSV or Parquet are supported",
            Self::SchemaIdentificationFailed => {
                "The artifact's columns do not match any allowlisted table"
            }
            Self::ResultTooLarge => "Add a tighter LIMIT or select fewer columns",
            Self::PolicyMissing => "Reference at least one allowlisted table",
            Self::InternalAllowlistLookupFailure => "Retry the request; the policy may be inconsistent",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A refused request: the failing step, a message, and an actionable hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub kind: RejectionKind,
    pub message: String,
    pub hint: String,
}

impl Rejection {
    /// Create a rejection carrying the kind's default hint.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hint: kind.default_hint().to_string(),
        }
    }

    /// Replace the hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = hint.into();
        self
    }

    pub fn category(&self) -> &'static str {
        self.kind.category()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The verdict of one validation pass. Never partially true: when `ok` is
/// set every other field is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyDecision {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<RejectionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl SafetyDecision {
    pub fn accept() -> Self {
        Self {
            ok: true,
            error_kind: None,
            error: None,
            hint: None,
        }
    }

    pub fn reject(rejection: &Rejection) -> Self {
        Self {
            ok: false,
            error_kind: Some(rejection.kind),
            error: Some(rejection.message.clone()),
            hint: Some(rejection.hint.clone()),
        }
    }
}

impl<T> From<&Result<T, Rejection>> for SafetyDecision {
    fn from(result: &Result<T, Rejection>) -> Self {
        match result {
            Ok(_) => Self::accept(),
            Err(rejection) => Self::reject(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_categories() {
        assert_eq!(RejectionKind::BatchNotAllowed.category(), "SQL_VALIDATION_ERROR");
        assert_eq!(RejectionKind::ArtifactNotFound.category(), "ARTIFACT_ERROR");
        assert_eq!(RejectionKind::ResultTooLarge.category(), "RESULT_TOO_LARGE");
        assert_eq!(RejectionKind::PolicyMissing.category(), "POLICY_ERROR");
    }

    #[test]
    fn test_accept_serializes_without_error_fields() {
        let decision = SafetyDecision::accept();
        assert_eq!(serde_json::to_value(&decision).unwrap(), json!({ "ok": true }));
    }

    #[test]
    fn test_reject_carries_kind_and_hint() {
        let rejection = Rejection::new(RejectionKind::LimitRequired, "Query must include a LIMIT clause");
        let decision = SafetyDecision::from(&Err::<(), _>(rejection));

        assert!(!decision.ok);
        assert_eq!(decision.error_kind, Some(RejectionKind::LimitRequired));
        assert_eq!(decision.hint.as_deref(), Some("Add LIMIT 100 or similar"));
        assert_eq!(
            serde_json::to_value(&decision).unwrap()["error_kind"],
            json!("LimitRequired")
        );
    }
}
