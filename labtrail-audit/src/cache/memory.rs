//! In-memory log cache

use labtrail_core::domain::log::{JobId, LogEntry};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{LogCache, restore_front};

/// Process-lifetime cache
///
/// Uses a `Mutex<HashMap<..>>` so one instance can be shared across loggers
/// through `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryLogCache {
    jobs: Mutex<HashMap<JobId, Vec<LogEntry>>>,
}

impl InMemoryLogCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Vec<LogEntry>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogCache for InMemoryLogCache {
    fn append(&self, job_id: JobId, entry: LogEntry) {
        self.lock().entry(job_id).or_default().push(entry);
    }

    fn drain(&self, job_id: JobId) -> Vec<LogEntry> {
        self.lock()
            .get_mut(&job_id)
            .map(std::mem::take)
            .unwrap_or_default()
    }

    fn peek(&self, job_id: JobId) -> Vec<LogEntry> {
        self.lock().get(&job_id).cloned().unwrap_or_default()
    }

    fn requeue(&self, job_id: JobId, entries: Vec<LogEntry>) {
        if entries.is_empty() {
            return;
        }
        restore_front(self.lock().entry(job_id).or_default(), entries);
    }

    fn pending_jobs(&self) -> Vec<JobId> {
        let mut jobs: Vec<JobId> = self
            .lock()
            .iter()
            .filter(|(_, entries)| !entries.is_empty())
            .map(|(job_id, _)| *job_id)
            .collect();
        jobs.sort();
        jobs
    }
}
