//! Errors raised by the MCP layer itself.
//!
//! Policy rejections and orchestrator failures are not errors here; they are
//! rendered into tool results by the executor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    /// The HTTP listener could not be bound.
    #[error("cannot start MCP server: {0}")]
    Startup(String),

    /// Tool arguments did not satisfy the tool's input schema.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("transport failed: {0}")]
    Transport(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
