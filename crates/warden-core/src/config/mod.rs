//! Configuration types for the Warden query gateway.
//!
//! Configuration is loaded from a single YAML file (`warden.yaml`). The
//! allowlist itself lives in a separate policy document referenced by
//! `allowlist_file`, resolved relative to the directory of the config file.
//!
//! ```yaml
//! upstream:
//!   database_url_env: DATABASE_URL
//!   pool:
//!     max_connections: 10
//! allowlist_file: allowlist.yaml
//! validation:
//!   schema_policy: strict
//! governor:
//!   token_budget: 128000
//! artifacts:
//!   directory: /tmp/artifacts
//! audit:
//!   file: audit.log
//! mcp:
//!   transport: stdio
//! ```

pub mod audit;
pub mod mcp;
pub mod upstream;

use crate::allowlist::AllowlistConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::AuditConfig;
pub use mcp::{McpConfig, Transport};
pub use upstream::{ConnectionPoolConfig, UpstreamConfig};

/// Complete Warden configuration loaded from `warden.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Project name, reported in the MCP server info.
    #[serde(default)]
    pub project: Option<String>,

    /// Upstream Postgres connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Path to the allowlist policy document.
    #[serde(default = "default_allowlist_file")]
    pub allowlist_file: PathBuf,

    /// SQL validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Row-limit governor settings.
    #[serde(default)]
    pub governor: GovernorConfig,

    /// Artifact storage settings.
    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    /// Audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,

    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            project: None,
            upstream: UpstreamConfig::default(),
            allowlist_file: default_allowlist_file(),
            validation: ValidationConfig::default(),
            governor: GovernorConfig::default(),
            artifacts: ArtifactsConfig::default(),
            audit: AuditConfig::default(),
            mcp: McpConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

/// How unqualified table names are treated in database mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicyMode {
    /// Reject any table reference without a schema qualifier.
    #[default]
    Strict,
    /// Qualify bare names with `validation.default_schema`.
    Lenient,
}

/// SQL validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default)]
    pub schema_policy: SchemaPolicyMode,

    /// Schema used to qualify bare names in lenient mode.
    #[serde(default = "default_schema")]
    pub default_schema: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            schema_policy: SchemaPolicyMode::default(),
            default_schema: default_schema(),
        }
    }
}

/// Dynamic row-limit governor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Total token budget of the consuming model.
    #[serde(default = "default_token_budget")]
    pub token_budget: u64,

    /// Share of the budget reserved for response overhead.
    #[serde(default = "default_reserve_ratio")]
    pub reserve_ratio: f64,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            reserve_ratio: default_reserve_ratio(),
        }
    }
}

/// Artifact storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Directory uploaded artifacts and delivery slips live in.
    #[serde(default = "default_artifacts_dir")]
    pub directory: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            directory: default_artifacts_dir(),
        }
    }
}

fn default_allowlist_file() -> PathBuf {
    PathBuf::from("allowlist.yaml")
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_token_budget() -> u64 {
    128_000
}

fn default_reserve_ratio() -> f64 {
    0.20
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("/tmp/artifacts")
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The allowlist policy document does not exist.
    #[error("policy document not found: {}", path.display())]
    PolicyNotFound { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WardenConfig {
    /// Load configuration from a YAML file. Relative paths inside the file
    /// resolve against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&content)?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Ok(config)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.governor.token_budget == 0 {
            return Err(ConfigError::Config(
                "governor.token_budget must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.governor.reserve_ratio) {
            return Err(ConfigError::Config(format!(
                "governor.reserve_ratio must be in [0, 1), got {}",
                self.governor.reserve_ratio
            )));
        }
        if self.upstream.pool.max_connections == 0 {
            return Err(ConfigError::Config(
                "upstream.pool.max_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve `path` against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Load the allowlist policy document this config points at.
    pub fn load_allowlist(&self) -> Result<AllowlistConfig, ConfigError> {
        AllowlistConfig::from_file(self.resolve_path(&self.allowlist_file))
    }

    /// Absolute-or-config-relative artifact directory.
    pub fn artifacts_dir(&self) -> PathBuf {
        self.resolve_path(&self.artifacts.directory)
    }

    /// Absolute-or-config-relative audit log path.
    pub fn audit_file(&self) -> PathBuf {
        self.resolve_path(&self.audit.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = WardenConfig::from_yaml("{}").unwrap();
        assert_eq!(config.validation.schema_policy, SchemaPolicyMode::Strict);
        assert_eq!(config.validation.default_schema, "public");
        assert_eq!(config.governor.token_budget, 128_000);
        assert_eq!(config.governor.reserve_ratio, 0.20);
        assert_eq!(config.artifacts.directory, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.upstream.pool.max_connections, 10);
        assert_eq!(config.audit.actor, "mcp_agent");
        assert_eq!(config.mcp.transport, Transport::Stdio);
    }

    #[test]
    fn test_parse_sections() {
        let yaml = r#"
project: demo
validation:
  schema_policy: lenient
  default_schema: app_data
governor:
  token_budget: 4000
  reserve_ratio: 0.5
mcp:
  transport: http
  port: 8080
"#;
        let config = WardenConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.project.as_deref(), Some("demo"));
        assert_eq!(config.validation.schema_policy, SchemaPolicyMode::Lenient);
        assert_eq!(config.validation.default_schema, "app_data");
        assert_eq!(config.governor.token_budget, 4000);
        assert_eq!(config.mcp.transport, Transport::Http);
        assert_eq!(config.mcp.port, 8080);
    }

    #[test]
    fn test_rejects_bad_reserve_ratio() {
        let err = WardenConfig::from_yaml("governor:\n  reserve_ratio: 1.5\n").unwrap_err();
        assert!(err.to_string().contains("reserve_ratio"));
    }

    #[test]
    fn test_allowlist_resolves_relative_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = fs::File::create(dir.path().join("policy.yaml")).unwrap();
        policy
            .write_all(b"allowlist:\n  app_data:\n    users:\n      email: { description: Email }\n")
            .unwrap();
        fs::write(dir.path().join("warden.yaml"), "allowlist_file: policy.yaml\n").unwrap();

        let config = WardenConfig::from_file(dir.path().join("warden.yaml")).unwrap();
        let allowlist = config.load_allowlist().unwrap();
        assert_eq!(allowlist.table_names(), vec!["app_data.users"]);
    }

    #[test]
    fn test_missing_policy_document() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("warden.yaml"), "{}\n").unwrap();

        let config = WardenConfig::from_file(dir.path().join("warden.yaml")).unwrap();
        assert!(matches!(
            config.load_allowlist(),
            Err(ConfigError::PolicyNotFound { .. })
        ));
    }
}
