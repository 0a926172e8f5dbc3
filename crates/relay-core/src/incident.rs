//! Incident snapshots as seen by the reconciliation engine.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status reported by the incident feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Resolved,
    Monitoring,
    Identified,
    Investigating,
    #[serde(other)]
    Other,
}

impl IncidentStatus {
    /// Maps a feed status label onto the tracked statuses; unknown labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "resolved" => Self::Resolved,
            "monitoring" => Self::Monitoring,
            "identified" => Self::Identified,
            "investigating" => Self::Investigating,
            _ => Self::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Monitoring => "monitoring",
            Self::Identified => "identified",
            Self::Investigating => "investigating",
            Self::Other => "other",
        }
    }
}

/// One timestamped addition to an incident's narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdate {
    pub id: String,
    pub status: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Immutable per-poll snapshot of an incident.
///
/// `updates` is ordered oldest first; sources are responsible for
/// normalizing whatever order their feed uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub name: String,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub shortlink: Option<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub updates: Vec<IncidentUpdate>,
}

impl Incident {
    /// Returns the distinct sub-update ids present in this snapshot.
    pub fn update_ids(&self) -> BTreeSet<String> {
        self.updates
            .iter()
            .map(|update| update.id.clone())
            .collect()
    }
}
