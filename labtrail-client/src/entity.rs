//! Entity lookups for the dashboard

use labtrail_core::domain::session::{EntitySummary, SessionContext, endpoint_for_entity_class};
use serde_json::{Value, json};

use crate::RegistryClient;
use crate::error::Result;

/// Fetch the audit fields of the entity a session was opened on
///
/// Returns `Ok(None)` if the session carries no entity id, the entity class
/// has no known endpoint, or the registry has no record with that id.
pub async fn entity_data(
    client: &dyn RegistryClient,
    session: &SessionContext,
) -> Result<Option<EntitySummary>> {
    if session.entity_id <= 0 {
        tracing::debug!("Session has no entity id, skipping lookup");
        return Ok(None);
    }

    let Some(endpoint) = endpoint_for_entity_class(&session.entity_class) else {
        tracing::warn!("No endpoint for entity class {}", session.entity_class);
        return Ok(None);
    };

    let records = client
        .read(endpoint, &json!({ "id": session.entity_id }), None)
        .await?;

    let Some(record) = records.into_iter().next() else {
        tracing::info!(
            "No {} record with id {}",
            endpoint,
            session.entity_id
        );
        return Ok(None);
    };

    Ok(Some(EntitySummary {
        createdby: field_text(&record, "createdby"),
        created: field_text(&record, "created"),
        modified: field_text(&record, "modified"),
    }))
}

fn field_text(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
