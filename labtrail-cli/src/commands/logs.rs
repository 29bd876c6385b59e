//! Log command handlers
//!
//! Inspects and flushes audit entries waiting in the local cache.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use labtrail_audit::{FileLogCache, FlushOutcome, LogCache, render_json};
use labtrail_core::domain::log::{JobId, LogEntry};

use crate::config::Config;

/// Logs subcommands
#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show pending entries for a job
    Show {
        /// Registry job id
        job: u64,

        /// Print the entries as a JSON array of audit lines
        #[arg(long)]
        json: bool,
    },
    /// Push pending entries for a job to the registry
    Flush {
        /// Registry job id
        job: u64,
    },
    /// List jobs with pending entries
    Pending,
}

/// Handle logs commands
///
/// # Arguments
/// * `command` - The logs command to execute
/// * `config` - The CLI configuration
pub async fn handle_logs_command(command: LogsCommands, config: &Config) -> Result<()> {
    match command {
        LogsCommands::Show { job, json } => show_logs(config, job, json),
        LogsCommands::Flush { job } => flush_logs(config, job).await,
        LogsCommands::Pending => list_pending(config),
    }
}

fn open_cache(config: &Config) -> Result<FileLogCache> {
    let dir = config
        .cache_dir()
        .context("No log cache directory configured")?;
    FileLogCache::open(dir).context("Failed to open log cache")
}

fn parse_job(job: u64) -> Result<JobId> {
    match JobId::new(job) {
        Some(job_id) => Ok(job_id),
        None => bail!("job id must be a positive integer"),
    }
}

/// Show pending entries for a job
fn show_logs(config: &Config, job: u64, json: bool) -> Result<()> {
    let job_id = parse_job(job)?;
    let entries = open_cache(config)?.peek(job_id);

    if json {
        println!("{}", render_json(&entries));
        return Ok(());
    }

    if entries.is_empty() {
        println!("{}", format!("No pending entries for job {}.", job_id).yellow());
    } else {
        println!(
            "{}",
            format!("{} pending entr(ies) for job {}:", entries.len(), job_id).bold()
        );
        println!("{}", "─".repeat(80).dimmed());
        for entry in &entries {
            print_log_entry(entry);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

/// Flush pending entries for a job
async fn flush_logs(config: &Config, job: u64) -> Result<()> {
    let factory = config.connect()?;
    let logger = factory.logger(job, &config.user)?;

    match logger.flush_logs().await {
        FlushOutcome::Empty => {
            println!("{}", format!("Nothing to flush for job {}.", job).yellow());
        }
        FlushOutcome::Flushed { entries } => {
            println!(
                "{} Flushed {} entr(ies) for job {}",
                "✓".green(),
                entries,
                job
            );
        }
        FlushOutcome::Failed {
            entries,
            requeued,
            error,
        } => {
            let fate = if requeued { "kept for retry" } else { "dropped" };
            bail!(
                "flush of {} entr(ies) for job {} failed ({}): {}",
                entries,
                job,
                fate,
                error
            );
        }
    }

    Ok(())
}

/// List jobs with pending entries
fn list_pending(config: &Config) -> Result<()> {
    let cache = open_cache(config)?;
    let jobs = cache.pending_jobs();

    if jobs.is_empty() {
        println!("{}", "No pending audit entries.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} job(s) with pending entries:", jobs.len()).bold()
    );
    for job_id in jobs {
        println!(
            "  {} Job {} ({} entr(ies))",
            "▸".cyan(),
            job_id.to_string().bold(),
            cache.peek(job_id).len()
        );
    }

    Ok(())
}

/// Print a single cached entry
fn print_log_entry(entry: &LogEntry) {
    let timestamp = entry.recorded_at.format("%Y-%m-%d %H:%M:%S");
    println!(
        "{} {} {} {}",
        timestamp.to_string().dimmed(),
        entry.username.cyan(),
        entry.operation.to_uppercase().bold(),
        entry.message
    );
}
