//! Token command handlers

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use labtrail_client::token::{VALIDATION_HOST, VALIDATION_URL};
use labtrail_client::{RegistryHttpClient, TokenValidator, entity_data};
use labtrail_core::domain::session::{SessionContext, TokenOutcome};

/// Token subcommands
#[derive(Subcommand)]
pub enum TokenCommands {
    /// Validate a registry token and show its session
    Validate {
        token: String,

        /// Validation endpoint
        #[arg(long, default_value = VALIDATION_URL)]
        url: String,

        /// Host header for the first validation attempt
        #[arg(long, default_value = VALIDATION_HOST)]
        host: String,

        /// Also fetch the entity the token was issued for
        #[arg(long)]
        entity: bool,
    },
}

/// Handle token commands
pub async fn handle_token_command(command: TokenCommands) -> Result<()> {
    match command {
        TokenCommands::Validate {
            token,
            url,
            host,
            entity,
        } => validate_token(&token, &url, &host, entity).await,
    }
}

async fn validate_token(token: &str, url: &str, host: &str, entity: bool) -> Result<()> {
    let validator = TokenValidator::new(url, host);
    let outcome = validator
        .validate(token)
        .await
        .context("Failed to reach token validation endpoint")?;

    let session = match outcome {
        TokenOutcome::Valid(session) => session,
        TokenOutcome::Expired => {
            println!("{}", TokenOutcome::EXPIRED.red().bold());
            return Ok(());
        }
        TokenOutcome::Invalid => bail!("token was rejected by the registry"),
    };

    print_session(&session);

    if entity {
        let client = RegistryHttpClient::from_session(&session)?;
        match entity_data(&client, &session).await? {
            Some(summary) => {
                println!("{}", "Entity:".bold());
                println!("  Created by: {}", summary.createdby.as_deref().unwrap_or("-"));
                println!("  Created:    {}", summary.created.as_deref().unwrap_or("-"));
                println!("  Modified:   {}", summary.modified.as_deref().unwrap_or("-"));
            }
            None => println!("{}", "Entity not found.".yellow()),
        }
    }

    Ok(())
}

fn print_session(session: &SessionContext) {
    println!("{}", "Session:".bold());
    println!("  Environment: {}", session.environment.cyan());
    println!(
        "  Web base:    {}",
        session.webbase.as_deref().unwrap_or("-").dimmed()
    );
    println!("  User:        {}", session.user.bold());
    println!(
        "  Entity:      {} {}",
        session.entity_class,
        session.entity_id.to_string().cyan()
    );
    println!("  Application: {}", session.application_id);
    println!("  Expires:     {}", session.token_expires.dimmed());
}
