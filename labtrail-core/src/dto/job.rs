//! Job DTOs

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::domain::log::JobId;

/// Record saved on the `job` endpoint to append to a job's audit log
///
/// The registry appends `logthis` to the job's log field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLogPayload {
    pub id: JobId,
    pub logthis: String,
}

impl JobLogPayload {
    /// Registry endpoint that accepts job log records
    pub const ENDPOINT: &'static str = "job";

    /// Record body for the registry `save` call
    pub fn to_record(&self) -> Value {
        json!({ "id": self.id, "logthis": self.logthis })
    }
}
