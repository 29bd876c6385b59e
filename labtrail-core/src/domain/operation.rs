//! Registry operations
//!
//! Every registry call that goes through the audit layer is described by a
//! [`RegistryOperation`]. The variant carries the call's arguments and knows
//! how to render them into the audit text stored for the job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registry call the audit layer knows how to execute and describe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RegistryOperation {
    /// Query an endpoint with a filter object
    Read {
        endpoint: String,
        filter: Value,
        max_results: Option<u32>,
    },
    /// Create or update a record on an endpoint
    Save { endpoint: String, record: Value },
}

impl RegistryOperation {
    pub fn read(endpoint: impl Into<String>, filter: Value) -> Self {
        Self::Read {
            endpoint: endpoint.into(),
            filter,
            max_results: None,
        }
    }

    pub fn save(endpoint: impl Into<String>, record: Value) -> Self {
        Self::Save {
            endpoint: endpoint.into(),
            record,
        }
    }

    /// Caps the number of records a read returns; no effect on saves
    pub fn with_max_results(mut self, limit: u32) -> Self {
        if let Self::Read { max_results, .. } = &mut self {
            *max_results = Some(limit);
        }
        self
    }

    /// Operation name used as the audit entry's operation
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Save { .. } => "save",
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Read { endpoint, .. } | Self::Save { endpoint, .. } => endpoint,
        }
    }

    /// Renders the call and all of its arguments as audit text
    ///
    /// ```
    /// use labtrail_core::domain::operation::RegistryOperation;
    /// use serde_json::json;
    ///
    /// let op = RegistryOperation::read("sample", json!({"id": 5})).with_max_results(10);
    /// assert_eq!(op.describe(), r#"read(endpoint=sample, obj={"id":5}, max_results=10)"#);
    /// ```
    pub fn describe(&self) -> String {
        match self {
            Self::Read {
                endpoint,
                filter,
                max_results,
            } => {
                let limit = max_results
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "none".to_string());
                format!("read(endpoint={endpoint}, obj={filter}, max_results={limit})")
            }
            Self::Save { endpoint, record } => {
                format!("save(endpoint={endpoint}, obj={record})")
            }
        }
    }
}
