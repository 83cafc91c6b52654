//! `warden fingerprint` - match an artifact's headers to an allowlisted table.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use warden_artifact::{ArtifactEngine, ArtifactFile};
use warden_policy::identify;

/// Arguments for `warden fingerprint`.
#[derive(Debug, Args)]
pub struct FingerprintArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "warden.yaml", env = "WARDEN_CONFIG")]
    pub config: PathBuf,

    /// CSV or Parquet file to inspect.
    pub file: PathBuf,
}

pub async fn run(args: FingerprintArgs) -> Result<ExitCode> {
    let (_, allowlist) = super::load(&args.config)?;

    let file = ArtifactFile {
        file_id: args
            .file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: args.file.clone(),
    };
    let headers = ArtifactEngine::new()
        .headers(&file)
        .await
        .with_context(|| format!("failed to read headers of {}", args.file.display()))?;

    let matched = identify(&headers, &allowlist);
    super::print_json(&json!({
        "file": args.file.display().to_string(),
        "headers": headers,
        "match": matched,
    }))?;

    Ok(if matched.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
