//! Tool execution.
//!
//! Maps tool calls onto the orchestrator and shapes every outcome into the
//! JSON payload the agent receives.

use crate::error::McpError;
use crate::protocol::{CallToolResponse, ToolContent};
use crate::tools::{
    ANALYZE_ARTIFACT, AnalyzeArtifactArgs, DESCRIBE_SCHEMA, READ_QUERY, ReadQueryArgs,
    ToolArguments,
};
use serde_json::{Value, json};
use std::sync::Arc;
use warden_core::Rejection;
use warden_runtime::{Orchestrator, RuntimeError};

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    /// Whether the call produced data.
    pub success: bool,
    /// Payload shown to the agent.
    pub payload: Value,
}

impl ExecutionResult {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    /// A policy rejection.
    pub fn rejected(rejection: &Rejection) -> Self {
        Self {
            success: false,
            payload: json!({
                "error": rejection.message,
                "hint": rejection.hint,
                "category": rejection.category(),
                "kind": rejection.kind,
            }),
        }
    }

    /// Arguments failed the tool's input schema.
    pub fn invalid_arguments(error: &McpError) -> Self {
        Self {
            success: false,
            payload: json!({
                "error": error.to_string(),
                "hint": "Check the tool's input schema",
                "category": "INVALID_ARGUMENTS",
            }),
        }
    }

    /// An infrastructure failure.
    pub fn failed(error: &RuntimeError) -> Self {
        Self {
            success: false,
            payload: json!({
                "error": error.to_string(),
                "hint": "The request was not completed; retry later",
                "category": "INTERNAL_ERROR",
            }),
        }
    }

    pub fn into_response(self) -> CallToolResponse {
        let text = serde_json::to_string_pretty(&self.payload)
            .unwrap_or_else(|_| self.payload.to_string());
        CallToolResponse {
            content: vec![ToolContent::Text { text }],
            is_error: !self.success,
        }
    }
}

/// Executes gateway tools.
pub struct ToolExecutor {
    orchestrator: Arc<Orchestrator>,
}

impl ToolExecutor {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Execute `tool`. `None` when no such tool exists.
    pub async fn execute(&self, tool: &str, arguments: Value) -> Option<ExecutionResult> {
        let result = match tool {
            ANALYZE_ARTIFACT => self.analyze_artifact(arguments).await,
            READ_QUERY => self.read_query(arguments).await,
            DESCRIBE_SCHEMA => self.describe_schema().await,
            _ => return None,
        };
        tracing::info!(tool, success = result.success, "tool call finished");
        Some(result)
    }

    async fn analyze_artifact(&self, arguments: Value) -> ExecutionResult {
        let args = match AnalyzeArtifactArgs::parse(arguments) {
            Ok(args) => args,
            Err(e) => return ExecutionResult::invalid_arguments(&e),
        };

        match self
            .orchestrator
            .analyze_artifact(&args.file_id, &args.sql_query, &args.justification)
            .await
        {
            Ok(Ok(outcome)) => ExecutionResult::success(json!({ "ok": true, "analyzed": outcome })),
            Ok(Err(rejection)) => ExecutionResult::rejected(&rejection),
            Err(e) => infrastructure(ANALYZE_ARTIFACT, e),
        }
    }

    async fn read_query(&self, arguments: Value) -> ExecutionResult {
        let args = match ReadQueryArgs::parse(arguments) {
            Ok(args) => args,
            Err(e) => return ExecutionResult::invalid_arguments(&e),
        };

        match self
            .orchestrator
            .read_query(&args.sql_query, &args.justification)
            .await
        {
            Ok(Ok(rows)) => ExecutionResult::success(json!({ "ok": true, "result": rows })),
            Ok(Err(rejection)) => ExecutionResult::rejected(&rejection),
            Err(e) => infrastructure(READ_QUERY, e),
        }
    }

    async fn describe_schema(&self) -> ExecutionResult {
        match self.orchestrator.describe_schema().await {
            Ok(tables) => ExecutionResult::success(json!({ "ok": true, "tables": tables })),
            Err(e) => infrastructure(DESCRIBE_SCHEMA, e),
        }
    }
}

fn infrastructure(tool: &str, error: RuntimeError) -> ExecutionResult {
    tracing::error!(tool, error = %error, "tool call failed");
    ExecutionResult::failed(&error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::RejectionKind;

    #[test]
    fn test_rejected_payload() {
        let rejection = Rejection::new(RejectionKind::LimitRequired, "Query has no LIMIT");
        let result = ExecutionResult::rejected(&rejection);
        assert!(!result.success);
        assert_eq!(
            result.payload,
            json!({
                "error": "Query has no LIMIT",
                "hint": "Add LIMIT 100 or similar",
                "category": "SQL_VALIDATION_ERROR",
                "kind": "LimitRequired",
            })
        );
    }

    #[test]
    fn test_into_response_marks_errors() {
        let response = ExecutionResult::success(json!({ "ok": true })).into_response();
        assert!(!response.is_error);

        let rejection = Rejection::new(RejectionKind::BatchNotAllowed, "two statements");
        let response = ExecutionResult::rejected(&rejection).into_response();
        assert!(response.is_error);
        let ToolContent::Text { text } = &response.content[0];
        assert!(text.contains("SQL_VALIDATION_ERROR"));
    }
}
