//! `warden audit` - read the audit trail back.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use warden_audit::{AuditFilter, AuditLogger};
use warden_core::WardenConfig;

/// Arguments for `warden audit`.
#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "warden.yaml", env = "WARDEN_CONFIG")]
    pub config: PathBuf,

    /// Only entries for this tool (analyze_artifact or read_query).
    #[arg(long)]
    pub action: Option<String>,

    /// Only entries written by this actor.
    #[arg(long)]
    pub actor: Option<String>,

    /// Only entries at or after this RFC 3339 timestamp.
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Show at most this many of the most recent entries.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

pub async fn run(args: AuditArgs) -> Result<ExitCode> {
    let config = WardenConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    let logger = AuditLogger::with_path(config.audit.clone(), config.audit_file());

    let filter = AuditFilter {
        action: args.action,
        actor_id: args.actor,
        since: args.since,
        limit: Some(args.limit),
    };
    let entries = logger
        .query(&filter)
        .await
        .with_context(|| format!("failed to read {}", config.audit_file().display()))?;

    for entry in &entries {
        println!("{}", serde_json::to_string(entry)?);
    }

    Ok(ExitCode::SUCCESS)
}
