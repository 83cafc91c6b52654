//! Audit logging configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for audit logging.
///
/// Every tool invocation appends one entry; there is no switch to turn
/// auditing off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON Lines file entries are appended to.
    #[serde(default = "default_file")]
    pub file: PathBuf,

    /// Mirror each entry to stderr.
    #[serde(default)]
    pub stdout: bool,

    /// Actor recorded for calls arriving over MCP.
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            file: default_file(),
            stdout: false,
            actor: default_actor(),
        }
    }
}

fn default_file() -> PathBuf {
    PathBuf::from("audit.log")
}

fn default_actor() -> String {
    "mcp_agent".to_string()
}
