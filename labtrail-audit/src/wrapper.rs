//! Audited registry calls
//!
//! Executes a [`RegistryOperation`] against the end user's registry client
//! and records a description of the call in the job's audit log. The call
//! is logged whether it succeeds or fails; a failure is then returned to the
//! caller unchanged.

use labtrail_client::{RegistryClient, Result as ClientResult};
use labtrail_core::domain::operation::RegistryOperation;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{CallError, LoggerError};
use crate::logger::{Logger, LoggerFactory};

/// Executes `operation` as the end user and audits it for `(job_id, username)`
///
/// # Arguments
/// * `factory` - Source of the power-user logger for the job
/// * `job_id` - Job the call is recorded against
/// * `username` - Operator recorded in the audit entry
/// * `client` - Registry client authenticated as the end user
/// * `operation` - The call to execute
/// * `flush_immediately` - Flush the job's pending entries after recording
///
/// # Returns
/// The operation's records, unchanged
pub async fn logthis(
    factory: &LoggerFactory,
    job_id: u64,
    username: &str,
    client: &dyn RegistryClient,
    operation: &RegistryOperation,
    flush_immediately: bool,
) -> Result<Vec<Value>, CallError> {
    let logger = factory.logger(job_id, username)?;
    Ok(execute_logged(&logger, client, operation, flush_immediately).await?)
}

async fn execute_logged(
    logger: &Logger,
    client: &dyn RegistryClient,
    operation: &RegistryOperation,
    flush_immediately: bool,
) -> ClientResult<Vec<Value>> {
    let description = operation.describe();
    let result = client.execute(operation).await;

    let message = match &result {
        Ok(_) => description,
        Err(e) => format!("{} -> failed: {}", description, e),
    };
    logger
        .log_operation(operation.name(), &message, flush_immediately)
        .await;

    result
}

/// A user's registry client whose calls are audited against one job
pub struct AuditedRegistry {
    client: Arc<dyn RegistryClient>,
    logger: Logger,
}

impl AuditedRegistry {
    pub fn new(client: Arc<dyn RegistryClient>, logger: Logger) -> Self {
        Self { client, logger }
    }

    /// Wraps `client` with a logger for `(job_id, username)` from `factory`
    pub fn from_factory(
        factory: &LoggerFactory,
        job_id: u64,
        username: &str,
        client: Arc<dyn RegistryClient>,
    ) -> Result<Self, LoggerError> {
        Ok(Self::new(client, factory.logger(job_id, username)?))
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Executes and audits an operation
    pub async fn logthis(
        &self,
        operation: &RegistryOperation,
        flush_immediately: bool,
    ) -> ClientResult<Vec<Value>> {
        execute_logged(&self.logger, self.client.as_ref(), operation, flush_immediately).await
    }

    /// Audited read
    pub async fn read(
        &self,
        endpoint: &str,
        filter: Value,
        max_results: Option<u32>,
        flush_immediately: bool,
    ) -> ClientResult<Vec<Value>> {
        let mut operation = RegistryOperation::read(endpoint, filter);
        if let Some(limit) = max_results {
            operation = operation.with_max_results(limit);
        }
        self.logthis(&operation, flush_immediately).await
    }

    /// Audited save
    pub async fn save(
        &self,
        endpoint: &str,
        record: Value,
        flush_immediately: bool,
    ) -> ClientResult<Vec<Value>> {
        self.logthis(&RegistryOperation::save(endpoint, record), flush_immediately)
            .await
    }
}
