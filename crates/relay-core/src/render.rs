//! Renders incidents into channel-neutral message content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Incident, RenderSettings};

/// Per-field body limit enforced by embed-style channels.
pub const FIELD_VALUE_MAX_CHARS: usize = 1024;
/// Separator between the field heading and the sub-update id.
const FIELD_ID_SEPARATOR: &str = " - ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageField {
    pub name: String,
    pub value: String,
}

/// Fully rendered message for one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    pub title: String,
    pub url: Option<String>,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub color: u32,
    pub fields: Vec<MessageField>,
    pub footer: String,
}

/// Renders the whole incident, one field per sub-update in source order.
pub fn render_incident(incident: &Incident, settings: &RenderSettings) -> MessageContent {
    let impact = incident.impact.as_deref().unwrap_or("none");
    let components = if incident.components.is_empty() {
        "none".to_string()
    } else {
        incident.components.join(", ")
    };
    let fields = incident
        .updates
        .iter()
        .map(|update| MessageField {
            name: format!(
                "{} (<t:{}{}>){}{}",
                capitalize(&update.status),
                update.created_at.timestamp(),
                settings.timestamp_format.suffix(),
                FIELD_ID_SEPARATOR,
                update.id
            ),
            value: truncate_chars(&update.body, FIELD_VALUE_MAX_CHARS),
        })
        .collect();

    MessageContent {
        title: incident.name.clone(),
        url: incident
            .shortlink
            .clone()
            .filter(|value| !value.trim().is_empty()),
        description: format!("Impact: {impact}\nAffected Components: {components}"),
        timestamp: incident.created_at,
        color: settings.colors.for_status(incident.status),
        fields,
        footer: incident.id.clone(),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{IncidentStatus, IncidentUpdate, StatusColors, TimestampFormat};

    fn incident_with_updates(updates: Vec<IncidentUpdate>) -> Incident {
        Incident {
            id: "wlf7gks7nb1m".to_string(),
            name: "Increased API Latency".to_string(),
            status: IncidentStatus::Monitoring,
            created_at: Utc.with_ymd_and_hms(2024, 8, 27, 20, 15, 35).unwrap(),
            impact: Some("minor".to_string()),
            shortlink: Some("https://stspg.io/ntfpn88g01pl".to_string()),
            components: vec!["API".to_string(), "Voice".to_string()],
            updates,
        }
    }

    fn update(id: &str, status: &str, minute: u32, body: &str) -> IncidentUpdate {
        IncidentUpdate {
            id: id.to_string(),
            status: status.to_string(),
            body: body.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 8, 27, 21, minute, 0).unwrap(),
        }
    }

    #[test]
    fn functional_render_incident_lists_updates_in_source_order() {
        let incident = incident_with_updates(vec![
            update("u1", "investigating", 0, "looking into it"),
            update("u2", "monitoring", 30, "fix deployed"),
        ]);
        let content = render_incident(&incident, &RenderSettings::default());

        assert_eq!(content.title, "Increased API Latency");
        assert_eq!(
            content.url.as_deref(),
            Some("https://stspg.io/ntfpn88g01pl")
        );
        assert_eq!(
            content.description,
            "Impact: minor\nAffected Components: API, Voice"
        );
        assert_eq!(content.footer, "wlf7gks7nb1m");
        assert_eq!(content.color, StatusColors::default().monitoring);
        assert_eq!(content.fields.len(), 2);
        let first_unix = incident.updates[0].created_at.timestamp();
        assert_eq!(
            content.fields[0].name,
            format!("Investigating (<t:{first_unix}:R>) - u1")
        );
        assert_eq!(content.fields[1].value, "fix deployed");
    }

    #[test]
    fn unit_render_uses_configured_timestamp_style_and_colors() {
        let incident = incident_with_updates(vec![update("u1", "identified", 5, "found")]);
        let settings = RenderSettings {
            colors: StatusColors {
                monitoring: 0x123456,
                ..StatusColors::default()
            },
            timestamp_format: TimestampFormat::Default,
        };
        let content = render_incident(&incident, &settings);
        assert_eq!(content.color, 0x123456);
        assert!(content.fields[0].name.contains(&format!(
            "<t:{}>",
            incident.updates[0].created_at.timestamp()
        )));
    }

    #[test]
    fn regression_render_truncates_long_bodies_on_char_boundaries() {
        let body = "é".repeat(FIELD_VALUE_MAX_CHARS + 10);
        let incident = incident_with_updates(vec![update("u1", "investigating", 0, &body)]);
        let content = render_incident(&incident, &RenderSettings::default());
        assert_eq!(content.fields[0].value.chars().count(), FIELD_VALUE_MAX_CHARS);
    }

    #[test]
    fn unit_render_handles_missing_optional_metadata() {
        let mut incident = incident_with_updates(Vec::new());
        incident.impact = None;
        incident.shortlink = Some("   ".to_string());
        incident.components.clear();
        let content = render_incident(&incident, &RenderSettings::default());
        assert_eq!(content.url, None);
        assert_eq!(content.description, "Impact: none\nAffected Components: none");
        assert!(content.fields.is_empty());
    }
}
