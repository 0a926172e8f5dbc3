//! Write-through snapshot store mapping incidents to their delivered message.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};

use relay_core::{IncidentStatus, RelayError, RelayResult};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::atomic_io::replace_file_contents;

/// Persisted link between an incident and the message mirroring it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationEntry {
    #[serde(alias = "id")]
    pub incident_id: String,
    #[serde(deserialize_with = "deserialize_message_id")]
    pub message_id: String,
    #[serde(default, alias = "update_ids")]
    pub delivered_update_ids: BTreeSet<String>,
    /// Incident status at the last delivery; absent for entries written before
    /// status tracking existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_status: Option<IncidentStatus>,
}

impl ReconciliationEntry {
    pub fn new(
        incident_id: impl Into<String>,
        message_id: impl Into<String>,
        delivered_update_ids: BTreeSet<String>,
        delivered_status: Option<IncidentStatus>,
    ) -> Self {
        Self {
            incident_id: incident_id.into(),
            message_id: message_id.into(),
            delivered_update_ids,
            delivered_status,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.incident_id.trim().is_empty() {
            return Err("incident id is empty".to_string());
        }
        if self.message_id.trim().is_empty() {
            return Err("message id is empty".to_string());
        }
        if self.delivered_update_ids.iter().any(|id| id.trim().is_empty()) {
            return Err("delivered update ids contain an empty id".to_string());
        }
        Ok(())
    }
}

/// Accepts string ids as well as the numeric ids older snapshots stored.
fn deserialize_message_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) if value.is_u64() => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "message id must be a string or unsigned integer, found {other}"
        ))),
    }
}

pub type ReconciliationEntries = BTreeMap<String, ReconciliationEntry>;

/// Reads and validates the persisted snapshot.
///
/// Returns `Ok(None)` when no snapshot exists yet. Records that fail
/// validation are skipped individually; only an unreadable file or a
/// non-array document fails the whole read.
pub fn read_snapshot(path: &Path) -> RelayResult<Option<ReconciliationEntries>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|error| RelayError::StoreRead {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })?;
    let document =
        serde_json::from_str::<Value>(&raw).map_err(|error| RelayError::StoreRead {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
    let Value::Array(records) = document else {
        return Err(RelayError::StoreRead {
            path: path.to_path_buf(),
            reason: "snapshot root must be a JSON array".to_string(),
        });
    };

    let mut entries = ReconciliationEntries::new();
    for (index, record) in records.into_iter().enumerate() {
        let parsed = serde_json::from_value::<ReconciliationEntry>(record)
            .map_err(|error| error.to_string())
            .and_then(|entry| entry.validate().map(|()| entry));
        match parsed {
            Ok(entry) => {
                if let Some(previous) = entries.insert(entry.incident_id.clone(), entry) {
                    warn!(
                        incident_id = %previous.incident_id,
                        "duplicate snapshot record; keeping the later one"
                    );
                }
            }
            Err(reason) => {
                warn!(
                    path = %path.display(),
                    record = index,
                    %reason,
                    "skipping malformed snapshot record"
                );
            }
        }
    }
    Ok(Some(entries))
}

/// Loads the snapshot, degrading to an empty mapping on any failure.
pub fn load_entries(path: &Path) -> ReconciliationEntries {
    match read_snapshot(path) {
        Ok(Some(entries)) => entries,
        Ok(None) => {
            warn!(path = %path.display(), "reconciliation snapshot not found; starting empty");
            ReconciliationEntries::new()
        }
        Err(error) => {
            error!(%error, "reconciliation snapshot unusable; starting empty");
            ReconciliationEntries::new()
        }
    }
}

/// Atomically overwrites the snapshot with `entries`.
pub fn save_entries(path: &Path, entries: &ReconciliationEntries) -> RelayResult<()> {
    let records = entries.values().collect::<Vec<_>>();
    let mut payload =
        serde_json::to_string_pretty(&records).map_err(|error| RelayError::StoreWrite {
            path: path.to_path_buf(),
            reason: error.to_string(),
        })?;
    payload.push('\n');
    replace_file_contents(path, &payload).map_err(|error| RelayError::StoreWrite {
        path: path.to_path_buf(),
        reason: format!("{error:#}"),
    })
}

/// In-memory reconciliation state persisted as a whole on every mutation.
#[derive(Debug)]
pub struct ReconciliationStore {
    path: PathBuf,
    entries: ReconciliationEntries,
}

impl ReconciliationStore {
    /// Opens the store at `path`; never fails, see [`load_entries`].
    pub fn load(path: PathBuf) -> Self {
        let entries = load_entries(&path);
        debug!(path = %path.display(), entries = entries.len(), "reconciliation store loaded");
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, incident_id: &str) -> Option<&ReconciliationEntry> {
        self.entries.get(incident_id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReconciliationEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces an entry, then persists the full snapshot.
    ///
    /// The in-memory insert stands even when persisting fails; the next
    /// successful save writes it out.
    pub fn put(&mut self, entry: ReconciliationEntry) -> RelayResult<()> {
        self.entries.insert(entry.incident_id.clone(), entry);
        self.save()
    }

    pub fn save(&self) -> RelayResult<()> {
        save_entries(&self.path, &self.entries)
    }
}
