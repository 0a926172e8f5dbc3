//! Statuspage `incidents.json` payload decoding.

use chrono::{DateTime, Utc};
use relay_core::{Incident, IncidentStatus, IncidentUpdate};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Deserialize)]
struct FeedComponent {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedIncidentUpdate {
    id: String,
    status: String,
    #[serde(default)]
    body: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
struct FeedIncident {
    id: String,
    #[serde(default)]
    name: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    shortlink: Option<String>,
    #[serde(default)]
    components: Option<Vec<FeedComponent>>,
    #[serde(default)]
    incident_updates: Option<Vec<FeedIncidentUpdate>>,
}

impl FeedIncident {
    fn into_incident(self) -> Result<Incident, String> {
        if self.id.trim().is_empty() {
            return Err("incident id is empty".to_string());
        }
        // Statuspage sends explicit nulls for absent optional fields.
        let incident_updates = self.incident_updates.unwrap_or_default();
        if let Some(update) = incident_updates
            .iter()
            .find(|update| update.id.trim().is_empty())
        {
            return Err(format!("update created at {} has no id", update.created_at));
        }

        // The feed lists updates newest first.
        let mut updates = incident_updates
            .into_iter()
            .rev()
            .map(|update| IncidentUpdate {
                id: update.id,
                status: update.status,
                body: update.body.unwrap_or_default(),
                created_at: update.created_at,
            })
            .collect::<Vec<_>>();
        updates.sort_by_key(|update| update.created_at);

        Ok(Incident {
            id: self.id,
            name: self.name.unwrap_or_default(),
            status: IncidentStatus::from_label(&self.status),
            created_at: self.created_at,
            impact: self.impact,
            shortlink: self.shortlink,
            components: self
                .components
                .unwrap_or_default()
                .into_iter()
                .map(|component| component.name)
                .collect(),
            updates,
        })
    }
}

/// Decodes an `incidents.json` document.
///
/// A document without an `incidents` array is an error; individual
/// incidents that fail to decode are skipped with a warning.
pub fn parse_incidents_payload(payload: &Value) -> Result<Vec<Incident>, String> {
    let records = payload
        .get("incidents")
        .and_then(Value::as_array)
        .ok_or_else(|| "feed payload has no incidents array".to_string())?;

    let mut incidents = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let decoded = serde_json::from_value::<FeedIncident>(record.clone())
            .map_err(|error| error.to_string())
            .and_then(FeedIncident::into_incident);
        match decoded {
            Ok(incident) => incidents.push(incident),
            Err(reason) => {
                let id = record.get("id").and_then(Value::as_str).unwrap_or("<unknown>");
                warn!(record = index, incident_id = id, %reason, "skipping malformed feed incident");
            }
        }
    }
    Ok(incidents)
}
