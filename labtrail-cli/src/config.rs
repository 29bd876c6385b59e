//! Configuration module
//!
//! Resolves CLI flags and environment into the settings the commands use.

use anyhow::{Context, Result};
use labtrail_audit::{AuditConfig, LoggerFactory};
use std::path::PathBuf;

/// Cache directory used when neither a flag nor the environment names one
const DEFAULT_CACHE_SUBDIR: &str = "labtrail";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Registry config file given on the command line
    pub registry_config: Option<PathBuf>,

    /// Operator recorded in audit entries
    pub user: String,

    /// Audit settings; always backed by a file cache for the CLI
    pub audit: AuditConfig,
}

impl Config {
    /// Builds the configuration
    ///
    /// Audit settings come from the environment; `cache_dir` overrides the
    /// cache location. The CLI is short-lived, so it always uses a file
    /// cache, defaulting to the user's cache directory.
    pub fn resolve(
        registry_config: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
        user: String,
    ) -> Result<Self> {
        Self::resolve_with(registry_config, cache_dir, user, |key| {
            std::env::var(key).ok()
        })
    }

    /// Same as [`Config::resolve`], reading audit settings through `lookup`
    pub fn resolve_with(
        registry_config: Option<PathBuf>,
        cache_dir: Option<PathBuf>,
        user: String,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut audit = AuditConfig::from_lookup(lookup).context("Invalid audit configuration")?;

        if let Some(dir) = cache_dir {
            audit.cache_dir = Some(dir);
        }
        if audit.cache_dir.is_none() {
            let base = dirs::cache_dir().context("Cannot determine a cache directory")?;
            audit.cache_dir = Some(base.join(DEFAULT_CACHE_SUBDIR));
        }
        tracing::debug!("Using log cache at {:?}", audit.cache_dir);

        Ok(Self {
            registry_config,
            user,
            audit,
        })
    }

    pub fn cache_dir(&self) -> Option<&PathBuf> {
        self.audit.cache_dir.as_ref()
    }

    /// Establishes the power-user session
    pub fn connect(&self) -> Result<LoggerFactory> {
        LoggerFactory::connect(self.registry_config.as_deref(), &self.audit)
            .context("Failed to establish power user session")
    }
}
