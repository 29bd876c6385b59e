//! Labtrail Registry Client
//!
//! A small, type-safe HTTP client for the laboratory registry REST API.
//!
//! The [`RegistryClient`] trait is the seam the audit layer depends on; the
//! HTTP implementation lives in [`RegistryHttpClient`]. Token validation and
//! entity lookups for the dashboard are in [`token`] and [`entity`].
//!
//! # Example
//!
//! ```no_run
//! use labtrail_client::{RegistryClient, RegistryHttpClient};
//! use serde_json::json;
//!
//! # async fn example() -> labtrail_client::Result<()> {
//! let client = RegistryHttpClient::new(
//!     "https://fgcz-bfabric-test.uzh.ch/bfabric",
//!     "alice",
//!     "ws-password",
//! );
//!
//! let samples = client.read("sample", &json!({"id": 42}), Some(1)).await?;
//! println!("Found {} sample(s)", samples.len());
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
mod records;
pub mod token;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use entity::entity_data;
pub use error::{ClientError, Result};
pub use token::TokenValidator;

use async_trait::async_trait;
use labtrail_core::domain::operation::RegistryOperation;
use labtrail_core::domain::session::SessionContext;
use reqwest::Client;
use serde_json::Value;

/// Read/save access to the registry
///
/// Implementations are authenticated when constructed; callers never pass
/// credentials per call.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Queries `endpoint` with a filter object
    ///
    /// # Arguments
    /// * `endpoint` - Registry entity collection, e.g. "sample"
    /// * `filter` - Query object, e.g. `{"id": 42}`
    /// * `max_results` - Optional cap on the number of records
    async fn read(
        &self,
        endpoint: &str,
        filter: &Value,
        max_results: Option<u32>,
    ) -> Result<Vec<Value>>;

    /// Creates or updates a record on `endpoint`
    ///
    /// # Returns
    /// The records as saved by the registry
    async fn save(&self, endpoint: &str, record: &Value) -> Result<Vec<Value>>;

    /// Executes a tagged operation by dispatching to `read` or `save`
    async fn execute(&self, operation: &RegistryOperation) -> Result<Vec<Value>> {
        match operation {
            RegistryOperation::Read {
                endpoint,
                filter,
                max_results,
            } => self.read(endpoint, filter, *max_results).await,
            RegistryOperation::Save { endpoint, record } => self.save(endpoint, record).await,
        }
    }
}

/// HTTP client for the registry REST API
///
/// Every request is sent with HTTP basic auth using the login and
/// web-service password the client was built with.
#[derive(Clone)]
pub struct RegistryHttpClient {
    /// Base URL of the registry (e.g., "https://fgcz-bfabric.uzh.ch/bfabric")
    base_url: String,
    login: String,
    password: String,
    /// HTTP client instance
    client: Client,
}

impl std::fmt::Debug for RegistryHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryHttpClient")
            .field("base_url", &self.base_url)
            .field("login", &self.login)
            .finish_non_exhaustive()
    }
}

impl RegistryHttpClient {
    /// Create a new registry client
    ///
    /// # Arguments
    /// * `base_url` - The registry base URL
    /// * `login` - Registry login
    /// * `password` - Web-service password for the login
    pub fn new(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_client(base_url, login, password, Client::new())
    }

    /// Create a new registry client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(
        base_url: impl Into<String>,
        login: impl Into<String>,
        password: impl Into<String>,
        client: Client,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            login: login.into(),
            password: password.into(),
            client,
        }
    }

    /// Create a client authenticated as the end user of a validated session
    ///
    /// Fails if the session's environment has no known web base URL.
    pub fn from_session(session: &SessionContext) -> Result<Self> {
        let base_url = session.webbase.as_deref().ok_or_else(|| {
            ClientError::InvalidRequest(format!(
                "unknown registry environment: {}",
                session.environment
            ))
        })?;

        Ok(Self::new(base_url, &session.user, &session.password))
    }

    /// Get the base URL of the registry
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the login requests are authenticated as
    pub fn login(&self) -> &str {
        &self.login
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle a registry response and normalise it to a list of records
    ///
    /// The registry answers with an array of records, a single record, or
    /// `null` when nothing matched.
    async fn handle_records(&self, response: reqwest::Response) -> Result<Vec<Value>> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

        records_from_body(body)
    }
}

fn records_from_body(body: Value) -> Result<Vec<Value>> {
    match body {
        Value::Array(records) => Ok(records),
        Value::Null => Ok(Vec::new()),
        record @ Value::Object(_) => Ok(vec![record]),
        other => Err(ClientError::ParseError(format!(
            "expected a record or a list of records, got: {}",
            other
        ))),
    }
}
