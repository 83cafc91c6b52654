use clap::{Parser, Subcommand, ValueEnum};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{audit, check, describe, fingerprint, serve};

#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Read-only SQL gateway for AI agents")]
struct Cli {
    /// Log output format. Logs always go to stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the MCP server.
    Serve(serve::ServeArgs),

    /// Validate a query offline and print the safety decision.
    Check(check::CheckArgs),

    /// Show which allowlisted table an artifact's headers match.
    Fingerprint(fingerprint::FingerprintArgs),

    /// Print the tables and columns agents may query.
    Describe(describe::DescribeArgs),

    /// Print recent audit entries.
    Audit(audit::AuditArgs),
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.cmd {
        Command::Serve(args) => serve::run(args).await,
        Command::Check(args) => check::run(args),
        Command::Fingerprint(args) => fingerprint::run(args).await,
        Command::Describe(args) => describe::run(args).await,
        Command::Audit(args) => audit::run(args).await,
    }
}
