//! CLI command implementations for the Warden gateway.

pub mod audit;
pub mod check;
pub mod describe;
pub mod fingerprint;
pub mod serve;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use warden_adapter_pg::PgDatabase;
use warden_core::{AllowlistConfig, WardenConfig};

/// Load `warden.yaml` and the allowlist it points at.
pub fn load(path: &Path) -> Result<(WardenConfig, Arc<AllowlistConfig>)> {
    let config = WardenConfig::from_file(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    let allowlist = config.load_allowlist().with_context(|| {
        format!(
            "failed to load allowlist from {}",
            config.resolve_path(&config.allowlist_file).display()
        )
    })?;

    if allowlist.is_empty() {
        tracing::warn!("allowlist is empty, every database query will be rejected");
    }
    tracing::debug!(tables = ?allowlist.table_names(), "allowlist loaded");

    Ok((config, Arc::new(allowlist)))
}

/// Lazily connected Postgres handle for `config.upstream`.
pub fn database(config: &WardenConfig) -> Result<PgDatabase> {
    PgDatabase::connect_lazy(&config.upstream, &config.validation.default_schema)
        .context("failed to configure the upstream database")
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
