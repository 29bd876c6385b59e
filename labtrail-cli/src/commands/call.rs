//! Audited registry call handlers
//!
//! Runs a read or save as the power user and records it against a job.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use labtrail_audit::logthis;
use labtrail_core::domain::operation::RegistryOperation;
use serde_json::Value;

use crate::config::Config;

/// Arguments shared by `read` and `save`
#[derive(Args)]
pub struct CallArgs {
    /// Registry job the call is recorded against
    job: u64,

    /// Registry endpoint, e.g. "sample"
    endpoint: String,

    /// JSON filter (read) or record (save)
    body: String,

    /// Maximum number of records to return (read only)
    #[arg(long)]
    max_results: Option<u32>,

    /// Flush the job's pending entries after the call
    #[arg(long)]
    flush: bool,
}

impl CallArgs {
    fn body(&self) -> Result<Value> {
        serde_json::from_str(&self.body)
            .with_context(|| format!("Body is not valid JSON: {}", self.body))
    }
}

/// Handle `labtrail read`
pub async fn handle_read(args: CallArgs, config: &Config) -> Result<()> {
    let mut operation = RegistryOperation::read(&args.endpoint, args.body()?);
    if let Some(limit) = args.max_results {
        operation = operation.with_max_results(limit);
    }
    run(operation, &args, config).await
}

/// Handle `labtrail save`
pub async fn handle_save(args: CallArgs, config: &Config) -> Result<()> {
    let operation = RegistryOperation::save(&args.endpoint, args.body()?);
    run(operation, &args, config).await
}

async fn run(operation: RegistryOperation, args: &CallArgs, config: &Config) -> Result<()> {
    let factory = config.connect()?;
    let client = factory.registry().clone();

    let records = logthis(
        &factory,
        args.job,
        &config.user,
        client.as_ref(),
        &operation,
        args.flush,
    )
    .await?;

    println!("{}", serde_json::to_string_pretty(&records)?);
    eprintln!(
        "{} {} recorded for job {}{}",
        "✓".green(),
        operation.name().to_uppercase(),
        args.job,
        if args.flush { " and flushed" } else { "" }
    );

    Ok(())
}
