//! `warden check` - validate a query without touching any data.

use anyhow::Result;
use clap::{Args, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use warden_core::QueryMode;
use warden_sql::SqlValidator;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Artifact,
    Database,
}

impl From<Mode> for QueryMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Artifact => QueryMode::Artifact,
            Mode::Database => QueryMode::Database,
        }
    }
}

/// Arguments for `warden check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Configuration file path.
    #[arg(short, long, default_value = "warden.yaml", env = "WARDEN_CONFIG")]
    pub config: PathBuf,

    /// Validate against an artifact or the allowlisted database.
    #[arg(long, value_enum, default_value_t = Mode::Database)]
    pub mode: Mode,

    /// The SQL to validate.
    pub sql: String,
}

/// Prints the decision; exits non-zero when the query is rejected.
pub fn run(args: CheckArgs) -> Result<ExitCode> {
    let (config, allowlist) = super::load(&args.config)?;
    let validator = SqlValidator::new(allowlist).with_config(&config.validation);

    let decision = validator.decide(&args.sql, args.mode.into());
    super::print_json(&decision)?;

    Ok(if decision.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
