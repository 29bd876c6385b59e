//! Audit log domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registry job
///
/// Registry ids are strictly positive; zero never names a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl JobId {
    /// Wraps a raw id, rejecting zero
    pub fn new(id: u64) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single audit line recorded against a job
///
/// Entries are immutable once created. Within a job they are kept in the
/// order they were produced; `recorded_at` is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Human operator who triggered the action
    pub username: String,
    /// Operation name, e.g. "read" or "save"
    pub operation: String,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

impl LogEntry {
    /// Creates an entry stamped with the current time
    pub fn new(
        username: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            operation: operation.into(),
            message: message.into(),
            recorded_at: Utc::now(),
        }
    }

    /// Audit trail line as stored in the registry
    ///
    /// Format: `USER: <username> | <OPERATION> - <message>`
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "USER: {} | {} - {}",
            self.username,
            self.operation.to_uppercase(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_rejects_zero() {
        assert!(JobId::new(0).is_none());
        assert_eq!(JobId::new(42).map(JobId::get), Some(42));
    }

    #[test]
    fn test_render_uppercases_operation() {
        let entry = LogEntry::new("alice", "read", "m1");
        assert_eq!(entry.render(), "USER: alice | READ - m1");
    }

    #[test]
    fn test_job_id_serializes_as_number() {
        let id = JobId::new(7).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
    }
}
