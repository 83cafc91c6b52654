//! `warden serve` - start the MCP server.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use warden_audit::AuditLogger;
use warden_core::Transport;
use warden_mcp::McpServer;
use warden_runtime::Orchestrator;

/// Arguments for `warden serve`.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "warden.yaml", env = "WARDEN_CONFIG")]
    pub config: PathBuf,

    /// Transport type (stdio or http). Overrides config file.
    #[arg(long)]
    pub transport: Option<Transport>,

    /// HTTP port (only for http transport). Overrides config file.
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn run(args: ServeArgs) -> Result<ExitCode> {
    let (mut config, allowlist) = super::load(&args.config)?;

    if let Some(transport) = args.transport {
        config.mcp.transport = transport;
    }
    if let Some(port) = args.port {
        config.mcp.port = port;
    }

    let artifacts = config.artifacts_dir();
    std::fs::create_dir_all(&artifacts)
        .with_context(|| format!("failed to create artifact directory {}", artifacts.display()))?;

    let database = super::database(&config)?;
    if let Err(e) = database.ping().await {
        tracing::warn!(error = %format!("{:#}", e), "upstream database is not reachable yet");
    }

    let audit = Arc::new(AuditLogger::with_path(
        config.audit.clone(),
        config.audit_file(),
    ));
    let orchestrator = Orchestrator::new(&config, allowlist.clone(), audit, Arc::new(database));

    tracing::info!(
        project = config.project.as_deref().unwrap_or("warden"),
        transport = ?config.mcp.transport,
        tables = allowlist.table_names().len(),
        upstream = %config.upstream.target(),
        artifacts = %artifacts.display(),
        audit_file = %config.audit_file().display(),
        "starting warden"
    );

    McpServer::new(config.mcp.clone(), Arc::new(orchestrator))
        .run()
        .await
        .context("MCP server failed")?;

    Ok(ExitCode::SUCCESS)
}
