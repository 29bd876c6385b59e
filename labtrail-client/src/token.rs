//! Token validation
//!
//! The dashboard is opened from the registry with a short-lived token in the
//! URL. [`TokenValidator`] checks that token against the registry and turns
//! the answer into a
//! [`SessionContext`](labtrail_core::domain::session::SessionContext).

use chrono::{Duration, Local, NaiveDateTime};
use labtrail_core::domain::session::TokenOutcome;
use labtrail_core::dto::token::TokenResponse;
use reqwest::{Client, StatusCode, header};

use crate::error::Result;

/// Default token validation endpoint
pub const VALIDATION_URL: &str = "https://fgcz-bfabric.uzh.ch/bfabric/rest/token/validate";

/// Host the validation request is addressed to
pub const VALIDATION_HOST: &str = "fgcz-bfabric.uzh.ch";

/// Format of `expiryDateTime` in validation responses
pub const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tokens expiring sooner than this are treated as already expired
pub const EXPIRY_MARGIN_MINUTES: i64 = 5;

/// Validates registry tokens
#[derive(Debug, Clone)]
pub struct TokenValidator {
    validation_url: String,
    host: String,
    client: Client,
}

impl Default for TokenValidator {
    fn default() -> Self {
        Self::new(VALIDATION_URL, VALIDATION_HOST)
    }
}

impl TokenValidator {
    /// Create a validator for a specific endpoint
    ///
    /// # Arguments
    /// * `validation_url` - Full URL of the validation endpoint
    /// * `host` - Value of the `Host` header sent on the first attempt
    pub fn new(validation_url: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            validation_url: validation_url.into(),
            host: host.into(),
            client: Client::new(),
        }
    }

    pub fn validation_url(&self) -> &str {
        &self.validation_url
    }

    /// Validate a token
    ///
    /// The request is sent with an explicit `Host` header first and retried
    /// once without it if the registry does not answer 200.
    ///
    /// # Returns
    /// * `TokenOutcome::Valid` with the session context
    /// * `TokenOutcome::Expired` if the token expires within five minutes
    /// * `TokenOutcome::Invalid` for empty tokens, rejected tokens and
    ///   unreadable responses
    ///
    /// Transport failures are returned as errors.
    pub async fn validate(&self, token: &str) -> Result<TokenOutcome> {
        if token.is_empty() {
            return Ok(TokenOutcome::Invalid);
        }

        let mut response = self
            .client
            .get(&self.validation_url)
            .query(&[("token", token)])
            .header(header::HOST, self.host.as_str())
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::debug!(
                "Token validation returned {}, retrying without Host header",
                response.status()
            );
            response = self
                .client
                .get(&self.validation_url)
                .query(&[("token", token)])
                .send()
                .await?;

            if response.status() != StatusCode::OK {
                tracing::warn!("Token validation rejected: {}", response.status());
                return Ok(TokenOutcome::Invalid);
            }
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Failed to read token validation body: {}", e);
                return Ok(TokenOutcome::Invalid);
            }
        };

        Ok(outcome_from_body(&body, Local::now().naive_local()))
    }
}

/// Interprets a validation response body at a given local time
pub fn outcome_from_body(body: &str, now: NaiveDateTime) -> TokenOutcome {
    let response: TokenResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!("Failed to parse token validation response: {}", e);
            return TokenOutcome::Invalid;
        }
    };

    match is_expired(&response.expiry_date_time, now) {
        Some(true) => TokenOutcome::Expired,
        Some(false) => TokenOutcome::Valid(response.into_session()),
        None => {
            tracing::warn!(
                "Unparsable token expiry: {}",
                response.expiry_date_time
            );
            TokenOutcome::Invalid
        }
    }
}

/// Checks an expiry timestamp against `now` plus the safety margin
///
/// Returns `None` if the timestamp cannot be parsed.
pub fn is_expired(expiry: &str, now: NaiveDateTime) -> Option<bool> {
    let expiry = NaiveDateTime::parse_from_str(expiry, EXPIRY_FORMAT).ok()?;
    let deadline = now + Duration::minutes(EXPIRY_MARGIN_MINUTES);
    Some(deadline > expiry)
}
