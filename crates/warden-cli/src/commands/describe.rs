//! `warden describe` - print the safe schema.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::process::ExitCode;

/// Arguments for `warden describe`.
#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "warden.yaml", env = "WARDEN_CONFIG")]
    pub config: PathBuf,
}

pub async fn run(args: DescribeArgs) -> Result<ExitCode> {
    let (config, allowlist) = super::load(&args.config)?;
    let database = super::database(&config)?;

    let tables = warden_runtime::describe(&allowlist, &database)
        .await
        .context("failed to read the live schema")?;
    super::print_json(&tables)?;

    Ok(ExitCode::SUCCESS)
}
