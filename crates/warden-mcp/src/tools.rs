//! Tool registry and the gateway's tool definitions.

use crate::error::McpError;
use crate::protocol::{ToolAnnotations, ToolDefinition};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const ANALYZE_ARTIFACT: &str = "analyze_artifact";
pub const READ_QUERY: &str = "read_query";
pub const DESCRIBE_SCHEMA: &str = "describe_schema";

const MIN_JUSTIFICATION_CHARS: usize = 20;

/// Registry of available MCP tools, listed in name order.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the gateway's three tools.
    pub fn gateway() -> Self {
        let mut registry = Self::new();
        registry.register(analyze_artifact_tool());
        registry.register(read_query_tool());
        registry.register(describe_schema_tool());
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tools.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        self.tools.values().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn read_only() -> Option<ToolAnnotations> {
    Some(ToolAnnotations {
        read_only_hint: Some(true),
        open_world_hint: Some(false),
    })
}

fn analyze_artifact_tool() -> ToolDefinition {
    ToolDefinition {
        name: ANALYZE_ARTIFACT.to_string(),
        description: Some(
            "Run a safe, AST-validated SQL query on a server-side artifact. \
             The artifact is exposed as a single table named `artifact`."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_id": {
                    "type": "string",
                    "minLength": 1,
                    "description": "Artifact file name, e.g. a delivery slip id"
                },
                "sql_query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "A single SELECT over the table `artifact`"
                },
                "justification": {
                    "type": "string",
                    "minLength": MIN_JUSTIFICATION_CHARS,
                    "description": "Why the user needs this analysis"
                }
            },
            "required": ["file_id", "sql_query", "justification"]
        }),
        annotations: read_only(),
    }
}

fn read_query_tool() -> ToolDefinition {
    ToolDefinition {
        name: READ_QUERY.to_string(),
        description: Some(
            "Safely execute a SELECT-only SQL query on the production PostgreSQL database. \
             Tables must be schema-qualified and allowlisted."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "sql_query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "A single SELECT with a LIMIT, or a pure aggregate"
                },
                "justification": {
                    "type": "string",
                    "minLength": MIN_JUSTIFICATION_CHARS,
                    "description": "Why the agent needs this data"
                }
            },
            "required": ["sql_query", "justification"]
        }),
        annotations: read_only(),
    }
}

fn describe_schema_tool() -> ToolDefinition {
    ToolDefinition {
        name: DESCRIBE_SCHEMA.to_string(),
        description: Some(
            "List the tables and columns read_query may access, with their types and descriptions."
                .to_string(),
        ),
        input_schema: json!({ "type": "object", "properties": {} }),
        annotations: read_only(),
    }
}

/// Arguments of `analyze_artifact`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeArtifactArgs {
    pub file_id: String,
    pub sql_query: String,
    pub justification: String,
}

/// Arguments of `read_query`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadQueryArgs {
    pub sql_query: String,
    pub justification: String,
}

/// Typed, checked tool arguments.
pub trait ToolArguments: DeserializeOwned {
    const TOOL: &'static str;

    /// Constraints the JSON schema expresses but serde does not.
    fn check(&self) -> Result<(), String>;

    fn parse(arguments: Value) -> Result<Self, McpError> {
        let invalid = |reason: String| McpError::InvalidArguments {
            tool: Self::TOOL.to_string(),
            reason,
        };
        let args: Self = serde_json::from_value(arguments).map_err(|e| invalid(e.to_string()))?;
        args.check().map_err(invalid)?;
        Ok(args)
    }
}

impl ToolArguments for AnalyzeArtifactArgs {
    const TOOL: &'static str = ANALYZE_ARTIFACT;

    fn check(&self) -> Result<(), String> {
        require_non_empty("file_id", &self.file_id)?;
        require_non_empty("sql_query", &self.sql_query)?;
        require_justification(&self.justification, "justification must explain the user's intent")
    }
}

impl ToolArguments for ReadQueryArgs {
    const TOOL: &'static str = READ_QUERY;

    fn check(&self) -> Result<(), String> {
        require_non_empty("sql_query", &self.sql_query)?;
        require_justification(
            &self.justification,
            "justification must explain why the agent needs this data",
        )
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

fn require_justification(value: &str, message: &str) -> Result<(), String> {
    if value.trim().chars().count() < MIN_JUSTIFICATION_CHARS {
        return Err(format!(
            "{} (at least {} characters)",
            message, MIN_JUSTIFICATION_CHARS
        ));
    }
    Ok(())
}
