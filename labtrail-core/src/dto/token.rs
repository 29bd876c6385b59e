//! Token validation DTOs

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::session::{SessionContext, webbase_for};

/// Body returned by the registry's token validation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub expiry_date_time: String,
    pub environment: String,
    pub user: String,
    pub user_ws_password: String,
    pub entity_id: i64,
    pub entity_class_name: String,
    /// Numeric in practice, but kept loose since it is only echoed back
    pub application_id: Value,
}

impl TokenResponse {
    /// Converts the wire response into session context
    pub fn into_session(self) -> SessionContext {
        let application_id = match self.application_id {
            Value::String(s) => s,
            other => other.to_string(),
        };

        SessionContext {
            webbase: webbase_for(&self.environment).map(str::to_string),
            environment: self.environment,
            user: self.user,
            password: self.user_ws_password,
            entity_class: self.entity_class_name,
            entity_id: self.entity_id,
            application_id,
            token_expires: self.expiry_date_time,
        }
    }
}
