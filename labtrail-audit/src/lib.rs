//! Labtrail Audit
//!
//! Audit logging for registry calls made on behalf of dashboard users.
//!
//! Architecture:
//! - Cache: pending log entries per job, in memory or one file per job
//! - Logger: batches a job's entries and flushes them to the registry as the
//!   power user
//! - Wrapper: executes a registry operation and records what was done
//! - Configuration: power-user credentials and audit settings
//!
//! Entries accumulate locally until a flush pushes them to the job record in
//! one `save` call. A flush that fails is reported, never raised.

pub mod cache;
pub mod config;
pub mod error;
pub mod logger;
pub mod wrapper;

#[cfg(test)]
mod testing;

pub use cache::{FileLogCache, InMemoryLogCache, LogCache};
pub use config::{AuditConfig, FlushPolicy, RegistryConfig};
pub use error::{CacheError, CallError, ConfigError, LoggerError};
pub use logger::{FlushOutcome, Logger, LoggerFactory, render_json};
pub use wrapper::{AuditedRegistry, logthis};
