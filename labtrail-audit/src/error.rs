//! Error types for the audit layer

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the durable log cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt cache file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize entries: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Errors while resolving or reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory for default config path")]
    NoHomeDir,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Config section '{0}' not found")]
    MissingSection(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors constructing a logger
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Job id must be a positive integer")]
    InvalidJobId,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Failed to establish power user session: {0}")]
    Session(#[from] ConfigError),

    #[error("Failed to open log cache: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Errors from an audited registry call
///
/// A failing registry operation is carried unmodified in `Registry`.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Logger(#[from] LoggerError),

    #[error(transparent)]
    Registry(#[from] labtrail_client::ClientError),
}
