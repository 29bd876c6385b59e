//! Session domain types
//!
//! A registry token, once validated, becomes a [`SessionContext`] that the
//! dashboard keeps for the lifetime of the user's visit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Registry environments and their web base URLs
const ENVIRONMENTS: &[(&str, &str)] = &[
    ("Production", "https://fgcz-bfabric.uzh.ch/bfabric"),
    ("Test", "https://fgcz-bfabric-test.uzh.ch/bfabric"),
];

/// Returns the web base URL of a named registry environment
pub fn webbase_for(environment: &str) -> Option<&'static str> {
    ENVIRONMENTS
        .iter()
        .find(|(name, _)| *name == environment)
        .map(|(_, url)| *url)
}

/// Typed session data derived from a validated registry token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Registry environment name, e.g. "Production"
    pub environment: String,
    /// Web base URL for the environment, if it is a known one
    pub webbase: Option<String>,
    /// Login of the end user
    pub user: String,
    /// Web-service password issued with the token
    pub password: String,
    /// Class of the entity the dashboard was opened on, e.g. "Sample"
    pub entity_class: String,
    pub entity_id: i64,
    pub application_id: String,
    /// Expiry as sent by the registry (`%Y-%m-%d %H:%M:%S`)
    pub token_expires: String,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("environment", &self.environment)
            .field("webbase", &self.webbase)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("entity_class", &self.entity_class)
            .field("entity_id", &self.entity_id)
            .field("application_id", &self.application_id)
            .field("token_expires", &self.token_expires)
            .finish()
    }
}

/// Result of validating a registry token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Valid(SessionContext),
    /// Token expires within the safety margin
    Expired,
    /// Empty token, rejected by the registry, or unreadable response
    Invalid,
}

impl TokenOutcome {
    /// Sentinel text used by the dashboard for expired tokens
    pub const EXPIRED: &'static str = "EXPIRED";

    pub fn session(&self) -> Option<&SessionContext> {
        match self {
            Self::Valid(session) => Some(session),
            _ => None,
        }
    }
}

/// Audit fields of a registry entity shown by the dashboard
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub createdby: Option<String>,
    pub created: Option<String>,
    pub modified: Option<String>,
}

/// Maps a registry entity class to the endpoint that stores it
pub fn endpoint_for_entity_class(entity_class: &str) -> Option<&'static str> {
    match entity_class {
        "Run" => Some("run"),
        "Sample" => Some("sample"),
        "Project" | "Order" | "Container" => Some("container"),
        "Plate" => Some("plate"),
        _ => None,
    }
}
