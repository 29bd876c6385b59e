//! Local log cache
//!
//! Holds audit entries that have been recorded but not yet flushed to the
//! registry, keyed by job id. The cache is injected into loggers so several
//! loggers for the same job share one pending sequence.
//!
//! Per-job access is expected to be serialized by the caller: a drain
//! followed by a registry save is not atomic with respect to other loggers
//! working on the same job.

mod file;
mod memory;

pub use file::FileLogCache;
pub use memory::InMemoryLogCache;

use labtrail_core::domain::log::{JobId, LogEntry};

/// Store of pending audit entries per job
pub trait LogCache: Send + Sync {
    /// Appends an entry to the end of the job's sequence
    ///
    /// Creates the sequence if the job has none yet. Never fails; durable
    /// backends that cannot write keep the entry in memory and warn.
    fn append(&self, job_id: JobId, entry: LogEntry);

    /// Returns the job's pending entries and leaves its sequence empty
    fn drain(&self, job_id: JobId) -> Vec<LogEntry>;

    /// Returns a copy of the job's pending entries
    fn peek(&self, job_id: JobId) -> Vec<LogEntry>;

    /// Puts entries back in front of the job's sequence
    ///
    /// Used to restore a drained batch whose flush failed. Entries appended
    /// since the drain stay after the restored ones.
    fn requeue(&self, job_id: JobId, entries: Vec<LogEntry>);

    /// Lists jobs that currently have pending entries, in ascending order
    fn pending_jobs(&self) -> Vec<JobId>;
}

/// Splices `restored` in front of `pending`
fn restore_front(pending: &mut Vec<LogEntry>, restored: Vec<LogEntry>) {
    let newer = std::mem::replace(pending, restored);
    pending.extend(newer);
}
