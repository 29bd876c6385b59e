//! Job audit logger
//!
//! A [`Logger`] records what one user did within one job. Entries go to the
//! shared [`LogCache`] first; [`Logger::flush_logs`] pushes everything
//! pending for the job to the registry in a single `save` on the `job`
//! endpoint, authenticated as the power user rather than the end user.

use labtrail_client::{RegistryClient, RegistryHttpClient};
use labtrail_core::domain::log::{JobId, LogEntry};
use labtrail_core::dto::job::JobLogPayload;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::cache::{FileLogCache, InMemoryLogCache, LogCache};
use crate::config::{AuditConfig, FlushPolicy, RegistryConfig};
use crate::error::{LoggerError, Result};

/// What a flush did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending; the registry was not contacted
    Empty,
    /// The batch was saved to the registry
    Flushed { entries: usize },
    /// The registry save failed
    Failed {
        entries: usize,
        /// Whether the batch went back into the cache
        requeued: bool,
        error: String,
    },
}

impl FlushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Audit logger for one `(job, user)` pair
pub struct Logger {
    job_id: JobId,
    username: String,
    /// Registry session authenticated as the power user
    registry: Arc<dyn RegistryClient>,
    cache: Arc<dyn LogCache>,
    flush_policy: FlushPolicy,
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("job_id", &self.job_id)
            .field("username", &self.username)
            .field("flush_policy", &self.flush_policy)
            .finish_non_exhaustive()
    }
}

impl Logger {
    /// Creates a logger
    ///
    /// # Arguments
    /// * `job_id` - Registry job the entries belong to; must be positive
    /// * `username` - Human operator recorded in each entry; must not be empty
    /// * `registry` - Client already authenticated as the power user
    /// * `cache` - Pending-entry store, possibly shared with other loggers
    pub fn new(
        job_id: u64,
        username: impl Into<String>,
        registry: Arc<dyn RegistryClient>,
        cache: Arc<dyn LogCache>,
    ) -> Result<Self> {
        let job_id = JobId::new(job_id).ok_or(LoggerError::InvalidJobId)?;
        let username = username.into();
        if username.trim().is_empty() {
            return Err(LoggerError::EmptyUsername);
        }

        Ok(Self {
            job_id,
            username,
            registry,
            cache,
            flush_policy: FlushPolicy::default(),
        })
    }

    pub fn with_flush_policy(mut self, flush_policy: FlushPolicy) -> Self {
        self.flush_policy = flush_policy;
        self
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Records an operation for this job
    ///
    /// With `flush_immediately` the entry and everything still pending for
    /// the job is flushed right away and the outcome returned. Never fails.
    pub async fn log_operation(
        &self,
        operation: &str,
        message: &str,
        flush_immediately: bool,
    ) -> Option<FlushOutcome> {
        let entry = LogEntry::new(&self.username, operation, message);
        debug!(job_id = %self.job_id, operation, "Caching audit entry");
        self.cache.append(self.job_id, entry);

        if flush_immediately {
            Some(self.flush_logs().await)
        } else {
            None
        }
    }

    /// Pushes all pending entries for this job to the registry
    ///
    /// Entries are joined with newlines into one message and saved on the
    /// `job` endpoint. A failed save is logged and reported in the outcome;
    /// the flush policy decides whether the batch is dropped or requeued.
    pub async fn flush_logs(&self) -> FlushOutcome {
        let entries = self.cache.drain(self.job_id);
        if entries.is_empty() {
            return FlushOutcome::Empty;
        }

        let count = entries.len();
        let payload = JobLogPayload {
            id: self.job_id,
            logthis: entries
                .iter()
                .map(LogEntry::render)
                .collect::<Vec<_>>()
                .join("\n"),
        };

        match self
            .registry
            .save(JobLogPayload::ENDPOINT, &payload.to_record())
            .await
        {
            Ok(_) => {
                info!("Flushed {} audit entries for job {}", count, self.job_id);
                FlushOutcome::Flushed { entries: count }
            }
            Err(e) => {
                error!("Failed to save log to registry for job {}: {}", self.job_id, e);

                let requeued = self.flush_policy == FlushPolicy::RequeueOnFailure;
                if requeued {
                    self.cache.requeue(self.job_id, entries);
                }

                FlushOutcome::Failed {
                    entries: count,
                    requeued,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Entries recorded for this job and not yet flushed
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.cache.peek(self.job_id)
    }

    /// Pending entries as a JSON array of audit lines
    pub fn to_json(&self) -> String {
        render_json(&self.get_logs())
    }
}

/// Renders entries as a JSON array of audit lines
pub fn render_json(entries: &[LogEntry]) -> String {
    let lines: Vec<String> = entries.iter().map(LogEntry::render).collect();
    Value::from(lines).to_string()
}

/// Builds loggers that share one power-user session and one cache
///
/// Owns the cache, so every logger it hands out for a job sees the same
/// pending entries.
#[derive(Clone)]
pub struct LoggerFactory {
    registry: Arc<dyn RegistryClient>,
    cache: Arc<dyn LogCache>,
    flush_policy: FlushPolicy,
}

impl LoggerFactory {
    /// Creates a factory from an existing power-user client and cache
    pub fn new(registry: Arc<dyn RegistryClient>, cache: Arc<dyn LogCache>) -> Self {
        Self {
            registry,
            cache,
            flush_policy: FlushPolicy::default(),
        }
    }

    pub fn with_flush_policy(mut self, flush_policy: FlushPolicy) -> Self {
        self.flush_policy = flush_policy;
        self
    }

    /// Establishes the power-user session from configuration
    ///
    /// Opens a file cache when `audit.cache_dir` is set, otherwise an
    /// in-memory one.
    pub fn from_config(registry: &RegistryConfig, audit: &AuditConfig) -> Result<Self> {
        registry.validate()?;
        audit.validate()?;

        let http = reqwest::Client::builder()
            .timeout(audit.http_timeout)
            .build()?;
        let client = RegistryHttpClient::with_client(
            &registry.base_url,
            &registry.login,
            &registry.password,
            http,
        );

        let cache: Arc<dyn LogCache> = match &audit.cache_dir {
            Some(dir) => Arc::new(FileLogCache::open(dir)?),
            None => Arc::new(InMemoryLogCache::new()),
        };

        info!(
            "Power user session for {} at {} (flush policy: {})",
            registry.login, registry.base_url, audit.flush_policy
        );

        Ok(Self::new(Arc::new(client), cache).with_flush_policy(audit.flush_policy))
    }

    /// Loads the registry config (explicit path > env > default) and
    /// establishes the power-user session
    pub fn connect(config_path: Option<&Path>, audit: &AuditConfig) -> Result<Self> {
        let registry = RegistryConfig::load(config_path, None)?;
        Self::from_config(&registry, audit)
    }

    /// Logger for a job and user
    pub fn logger(&self, job_id: u64, username: &str) -> Result<Logger> {
        Ok(Logger::new(
            job_id,
            username,
            Arc::clone(&self.registry),
            Arc::clone(&self.cache),
        )?
        .with_flush_policy(self.flush_policy))
    }

    /// The power-user registry session
    pub fn registry(&self) -> &Arc<dyn RegistryClient> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<dyn LogCache> {
        &self.cache
    }

    pub fn flush_policy(&self) -> FlushPolicy {
        self.flush_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::testing::RecordingRegistry;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup() -> (Arc<RecordingRegistry>, Arc<InMemoryLogCache>) {
        (
            Arc::new(RecordingRegistry::new()),
            Arc::new(InMemoryLogCache::new()),
        )
    }

    fn logger(
        job_id: u64,
        username: &str,
        registry: &Arc<RecordingRegistry>,
        cache: &Arc<InMemoryLogCache>,
    ) -> Logger {
        Logger::new(job_id, username, registry.clone(), cache.clone()).unwrap()
    }

    #[test]
    fn test_construction_validates_inputs() {
        let (registry, cache) = setup();

        let err = Logger::new(0, "alice", registry.clone(), cache.clone()).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidJobId));

        let err = Logger::new(1, "  ", registry, cache).unwrap_err();
        assert!(matches!(err, LoggerError::EmptyUsername));
    }

    #[tokio::test]
    async fn test_entries_kept_in_call_order() {
        let (registry, cache) = setup();
        let log = logger(7, "alice", &registry, &cache);

        for i in 0..10 {
            let outcome = log.log_operation("read", &format!("m{}", i), false).await;
            assert!(outcome.is_none());
        }

        let messages: Vec<String> = log.get_logs().into_iter().map(|e| e.message).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("m{}", i)).collect();
        assert_eq!(messages, expected);
        assert_eq!(registry.save_attempts(), 0);
    }

    #[tokio::test]
    async fn test_flush_empty_cache_does_not_contact_registry() {
        let (registry, cache) = setup();
        let log = logger(7, "alice", &registry, &cache);

        assert_eq!(log.flush_logs().await, FlushOutcome::Empty);
        assert_eq!(registry.save_attempts(), 0);
    }

    #[tokio::test]
    async fn test_flush_batches_into_one_save() {
        let (registry, cache) = setup();
        let log = logger(42, "alice", &registry, &cache);

        log.log_operation("read", "m1", false).await;
        log.log_operation("save", "m2", false).await;
        let outcome = log.flush_logs().await;

        assert_eq!(outcome, FlushOutcome::Flushed { entries: 2 });
        assert_eq!(
            registry.saves(),
            vec![(
                "job".to_string(),
                json!({"id": 42, "logthis": "USER: alice | READ - m1\nUSER: alice | SAVE - m2"})
            )]
        );
        assert!(log.get_logs().is_empty());

        // Nothing left, so a second flush is a no-op
        assert_eq!(log.flush_logs().await, FlushOutcome::Empty);
        assert_eq!(registry.save_attempts(), 1);
    }

    #[tokio::test]
    async fn test_flush_immediately_includes_earlier_entries() {
        let (registry, cache) = setup();
        let log = logger(5, "bob", &registry, &cache);

        log.log_operation("read", "first", false).await;
        let outcome = log.log_operation("save", "second", true).await;

        assert_eq!(outcome, Some(FlushOutcome::Flushed { entries: 2 }));
        assert_eq!(registry.save_count(), 1);
        assert!(cache.peek(log.job_id()).is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_drops_batch_by_default() {
        let registry = Arc::new(RecordingRegistry::failing());
        let cache = Arc::new(InMemoryLogCache::new());
        let log = logger(5, "bob", &registry, &cache);

        let outcome = log.log_operation("save", "lost", true).await;

        match outcome {
            Some(FlushOutcome::Failed {
                entries, requeued, ..
            }) => {
                assert_eq!(entries, 1);
                assert!(!requeued);
            }
            other => panic!("expected failed flush, got {:?}", other),
        }
        assert_eq!(registry.save_attempts(), 1);
        assert!(log.get_logs().is_empty());

        // Registry recovers, but the batch is gone
        registry.set_failing(false);
        assert_eq!(log.flush_logs().await, FlushOutcome::Empty);
    }

    #[tokio::test]
    async fn test_failed_flush_requeues_when_configured() {
        let registry = Arc::new(RecordingRegistry::failing());
        let cache = Arc::new(InMemoryLogCache::new());
        let log = logger(5, "bob", &registry, &cache)
            .with_flush_policy(FlushPolicy::RequeueOnFailure);

        log.log_operation("read", "m1", false).await;
        let outcome = log.flush_logs().await;
        assert!(outcome.is_failure());
        log.log_operation("save", "m2", false).await;

        let messages: Vec<String> = log.get_logs().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["m1", "m2"]);

        registry.set_failing(false);
        assert_eq!(log.flush_logs().await, FlushOutcome::Flushed { entries: 2 });
        assert_eq!(
            registry.saves()[0].1["logthis"],
            json!("USER: bob | READ - m1\nUSER: bob | SAVE - m2")
        );
    }

    #[tokio::test]
    async fn test_loggers_share_job_cache() {
        let (registry, cache) = setup();
        let alice = logger(11, "alice", &registry, &cache);
        let bob = logger(11, "bob", &registry, &cache);
        let other_job = logger(12, "alice", &registry, &cache);

        alice.log_operation("read", "a", false).await;
        bob.log_operation("save", "b", false).await;
        other_job.log_operation("read", "c", false).await;

        assert_eq!(bob.flush_logs().await, FlushOutcome::Flushed { entries: 2 });
        assert_eq!(
            registry.saves()[0].1,
            json!({"id": 11, "logthis": "USER: alice | READ - a\nUSER: bob | SAVE - b"})
        );
        assert_eq!(other_job.get_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_to_json_renders_pending_lines() {
        let (registry, cache) = setup();
        let log = logger(3, "alice", &registry, &cache);

        assert_eq!(log.to_json(), "[]");
        log.log_operation("read", "m1", false).await;

        let parsed: Vec<String> = serde_json::from_str(&log.to_json()).unwrap();
        assert_eq!(parsed, vec!["USER: alice | READ - m1"]);
        assert_eq!(log.get_logs().len(), 1);
    }

    #[test]
    fn test_render_json_matches_flush_text() {
        let entries = vec![
            LogEntry::new("alice", "read", "m1"),
            LogEntry::new("bob", "save", "m2"),
        ];

        let parsed: Vec<String> = serde_json::from_str(&render_json(&entries)).unwrap();
        assert_eq!(parsed, vec!["USER: alice | READ - m1", "USER: bob | SAVE - m2"]);
        assert_eq!(render_json(&[]), "[]");
    }

    #[tokio::test]
    async fn test_file_cache_flush_leaves_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let registry = Arc::new(RecordingRegistry::new());
        let cache = Arc::new(FileLogCache::open(temp_dir.path()).unwrap());
        let log = Logger::new(42, "alice", registry.clone(), cache.clone()).unwrap();

        log.log_operation("read", "m1", false).await;
        assert_eq!(cache.load(log.job_id()).unwrap().len(), 1);

        log.flush_logs().await;

        assert!(cache.load(log.job_id()).unwrap().is_empty());
        assert_eq!(registry.save_count(), 1);
    }

    #[tokio::test]
    async fn test_factory_shares_cache_and_policy() {
        let registry: Arc<dyn RegistryClient> = Arc::new(RecordingRegistry::new());
        let cache: Arc<dyn LogCache> = Arc::new(InMemoryLogCache::new());
        let factory = LoggerFactory::new(registry, cache)
            .with_flush_policy(FlushPolicy::RequeueOnFailure);

        let first = factory.logger(9, "alice").unwrap();
        first.log_operation("read", "m1", false).await;

        let second = factory.logger(9, "alice").unwrap();
        assert_eq!(second.get_logs().len(), 1);
        assert_eq!(factory.cache().pending_jobs(), vec![second.job_id()]);
        assert!(matches!(
            factory.logger(0, "alice"),
            Err(LoggerError::InvalidJobId)
        ));
    }

    #[test]
    fn test_factory_from_config_rejects_bad_credentials() {
        let registry = RegistryConfig {
            environment: "PRODUCTION".to_string(),
            login: String::new(),
            password: "pw".to_string(),
            base_url: "https://registry.example".to_string(),
        };

        let result = LoggerFactory::from_config(&registry, &AuditConfig::default());
        assert!(matches!(
            result,
            Err(LoggerError::Session(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_factory_from_config_opens_file_cache() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("audit-cache");
        let registry = RegistryConfig {
            environment: "TEST".to_string(),
            login: "audit-bot".to_string(),
            password: "pw".to_string(),
            base_url: "https://registry.example".to_string(),
        };
        let audit = AuditConfig::default()
            .with_cache_dir(&cache_dir)
            .with_flush_policy(FlushPolicy::RequeueOnFailure);

        let factory = LoggerFactory::from_config(&registry, &audit).unwrap();

        assert!(cache_dir.is_dir());
        assert_eq!(factory.flush_policy(), FlushPolicy::RequeueOnFailure);
    }

    #[test]
    fn test_connect_with_missing_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.yml");

        let result = LoggerFactory::connect(Some(&missing), &AuditConfig::default());
        assert!(matches!(
            result,
            Err(LoggerError::Session(ConfigError::Read { .. }))
        ));
    }
}
