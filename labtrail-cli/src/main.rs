//! Labtrail CLI
//!
//! Operator tool for the registry audit log: inspect and flush pending
//! entries, validate tokens, and run audited registry calls.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labtrail")]
#[command(about = "Registry audit log CLI", long_about = None)]
struct Cli {
    /// Power user config file (overrides LABTRAIL_REGISTRY_CONFIG and ~/.bfabricpy.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory of the pending log cache
    #[arg(long, global = true, env = "LABTRAIL_LOG_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Operator name recorded in audit entries
    #[arg(long, global = true, env = "LABTRAIL_USER", default_value = "labtrail-cli")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics go to stderr so command output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "labtrail_cli=info,labtrail_audit=info,labtrail_client=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.config, cli.cache_dir, cli.user)?;

    handle_command(cli.command, &config).await
}
