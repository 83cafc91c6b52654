//! # warden-mcp
//!
//! MCP (Model Context Protocol) server for the Warden gateway.
//!
//! The server exposes three read-only tools to an AI agent:
//!
//! | Tool | Arguments | Description |
//! |------|-----------|-------------|
//! | `analyze_artifact` | `file_id`, `sql_query`, `justification` | Query an uploaded CSV/Parquet file as the table `artifact` |
//! | `read_query` | `sql_query`, `justification` | Query allowlisted Postgres tables |
//! | `describe_schema` | none | List the tables and columns `read_query` may see |
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (list tools / call tool)
//!       ▼
//! ┌──────────────────┐
//! │ Warden MCP Server│
//! │ 1. Audit         │  ← warden-audit
//! │ 2. Validate SQL  │  ← warden-sql
//! │ 3. Execute       │  ← DuckDB / Postgres
//! │ 4. Govern rows   │  ← warden-policy
//! │ 5. Filter columns│
//! │ 6. Return JSON   │
//! └──────────────────┘
//! ```
//!
//! Every tool result is a single text block holding JSON. Successful calls
//! return `{ "ok": true, ... }`; refused calls return
//! `{ "error", "hint", "category" }` with `isError` set.
//!
//! ## Example Usage
//!
//! ```ignore
//! use warden_mcp::McpServer;
//!
//! let server = McpServer::new(config.mcp.clone(), Arc::new(orchestrator));
//! server.run().await?;
//! ```

pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use executor::{ExecutionResult, ToolExecutor};
pub use http_transport::create_router;
pub use protocol::{CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolContent};
pub use server::McpServer;
pub use tools::ToolRegistry;
