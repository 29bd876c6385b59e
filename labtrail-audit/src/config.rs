//! Audit configuration
//!
//! Two pieces of configuration drive the audit layer:
//! - [`RegistryConfig`]: the power-user credentials audit logs are written
//!   with, read from a YAML file
//! - [`AuditConfig`]: cache location, flush failure policy and HTTP timeout,
//!   read from environment variables
//!
//! The registry config file is located once at startup with the precedence
//! explicit path > `LABTRAIL_REGISTRY_CONFIG` > `~/.bfabricpy.yml`.

use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable naming the registry config file
pub const CONFIG_PATH_ENV: &str = "LABTRAIL_REGISTRY_CONFIG";

/// Environment variable selecting a section of the registry config file
pub const CONFIG_SECTION_ENV: &str = "LABTRAIL_REGISTRY_ENV";

/// Config file looked up in the home directory when nothing else is given
pub const DEFAULT_CONFIG_FILE: &str = ".bfabricpy.yml";

// =============================================================================
// Registry (power user) configuration
// =============================================================================

/// Credentials of the power user that writes audit logs
///
/// The file uses the bfabricpy layout:
///
/// ```yaml
/// GENERAL:
///   default_config: PRODUCTION
/// PRODUCTION:
///   login: audit-bot
///   password: 0123456789abcdef
///   base_url: https://fgcz-bfabric.uzh.ch/bfabric
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Section the credentials were taken from
    pub environment: String,
    pub login: String,
    pub password: String,
    pub base_url: String,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("environment", &self.environment)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "GENERAL", default)]
    general: GeneralSection,
    #[serde(flatten)]
    environments: HashMap<String, EnvironmentSection>,
}

#[derive(Debug, Default, Deserialize)]
struct GeneralSection {
    default_config: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentSection {
    login: String,
    password: String,
    base_url: String,
}

impl RegistryConfig {
    /// Locates and loads the power-user configuration
    ///
    /// # Arguments
    /// * `explicit_path` - Path given on the command line, if any
    /// * `section` - Section override; falls back to `LABTRAIL_REGISTRY_ENV`,
    ///   then to `GENERAL.default_config`
    pub fn load(explicit_path: Option<&Path>, section: Option<&str>) -> Result<Self, ConfigError> {
        let path = resolve_config_path(explicit_path)?;
        let section = section
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_SECTION_ENV).ok());

        Self::from_file(&path, section.as_deref())
    }

    /// Loads the configuration from a specific file
    pub fn from_file(path: &Path, section: Option<&str>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file: ConfigFile =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let config = Self::from_parsed(file, section)?;
        tracing::debug!(
            "Loaded registry config section {} from {}",
            config.environment,
            path.display()
        );
        Ok(config)
    }

    fn from_parsed(mut file: ConfigFile, section: Option<&str>) -> Result<Self, ConfigError> {
        let name = match section {
            Some(name) => name.to_string(),
            None => file.general.default_config.take().ok_or_else(|| {
                ConfigError::Invalid("no section selected and GENERAL.default_config unset".into())
            })?,
        };

        let env = file
            .environments
            .remove(&name)
            .ok_or_else(|| ConfigError::MissingSection(name.clone()))?;

        let config = Self {
            environment: name,
            login: env.login,
            password: env.password,
            base_url: env.base_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.login.is_empty() {
            return Err(ConfigError::Invalid("login cannot be empty".into()));
        }

        if self.password.is_empty() {
            return Err(ConfigError::Invalid("password cannot be empty".into()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(
                "base_url must start with http:// or https://".into(),
            ));
        }

        Ok(())
    }
}

/// Resolves the registry config file path
///
/// Precedence: explicit path > `LABTRAIL_REGISTRY_CONFIG` > `~/.bfabricpy.yml`.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    resolve_config_path_from(
        explicit_path,
        std::env::var_os(CONFIG_PATH_ENV),
        dirs::home_dir(),
    )
}

fn resolve_config_path_from(
    explicit_path: Option<&Path>,
    env_path: Option<OsString>,
    home: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit_path {
        return Ok(path.to_path_buf());
    }

    if let Some(path) = env_path.filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    home.map(|home| home.join(DEFAULT_CONFIG_FILE))
        .ok_or(ConfigError::NoHomeDir)
}

// =============================================================================
// Audit settings
// =============================================================================

/// What a failed flush does with the batch it drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// The batch is lost (at-most-once delivery)
    #[default]
    DropOnFailure,
    /// The batch goes back to the front of the cache for a later flush
    RequeueOnFailure,
}

impl FromStr for FlushPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::DropOnFailure),
            "requeue" => Ok(Self::RequeueOnFailure),
            other => Err(ConfigError::Invalid(format!(
                "unknown flush policy '{}' (expected 'drop' or 'requeue')",
                other
            ))),
        }
    }
}

impl fmt::Display for FlushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushPolicy::DropOnFailure => write!(f, "drop"),
            FlushPolicy::RequeueOnFailure => write!(f, "requeue"),
        }
    }
}

/// Audit layer settings
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Directory for the file cache; in-memory cache when unset
    pub cache_dir: Option<PathBuf>,

    pub flush_policy: FlushPolicy,

    /// Timeout for registry HTTP requests made by the power user
    pub http_timeout: Duration,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            flush_policy: FlushPolicy::default(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl AuditConfig {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - LABTRAIL_LOG_CACHE_DIR (optional, file cache directory)
    /// - LABTRAIL_FLUSH_POLICY (optional, `drop` or `requeue`, default: drop)
    /// - LABTRAIL_HTTP_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup` instead of the process environment
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let cache_dir = lookup("LABTRAIL_LOG_CACHE_DIR")
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let flush_policy = match lookup("LABTRAIL_FLUSH_POLICY") {
            Some(s) => s.parse()?,
            None => defaults.flush_policy,
        };

        let http_timeout = lookup("LABTRAIL_HTTP_TIMEOUT")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);

        let config = Self {
            cache_dir,
            flush_policy,
            http_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Uses a file cache in `dir`
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_flush_policy(mut self, policy: FlushPolicy) -> Self {
        self.flush_policy = policy;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "http_timeout must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}
