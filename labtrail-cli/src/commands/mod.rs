//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod call;
mod logs;
mod token;

pub use call::CallArgs;
pub use logs::LogsCommands;
pub use token::TokenCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pending audit log management
    Logs {
        #[command(subcommand)]
        command: LogsCommands,
    },
    /// Registry token tools
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },
    /// Audited registry read
    Read(CallArgs),
    /// Audited registry save
    Save(CallArgs),
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
///
/// # Arguments
/// * `command` - The command to execute
/// * `config` - The CLI configuration
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Logs { command } => logs::handle_logs_command(command, config).await,
        Commands::Token { command } => token::handle_token_command(command).await,
        Commands::Read(args) => call::handle_read(args, config).await,
        Commands::Save(args) => call::handle_save(args, config).await,
    }
}
