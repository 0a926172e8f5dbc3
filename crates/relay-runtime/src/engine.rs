//! Reconciliation state machine deciding how each incident reaches the channel.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use relay_core::{
    is_past_retention, render_incident, Incident, MessageChannel, MessageContent,
    ReconcilePolicy, RelayResult, RenderSettings,
};
use relay_store::{ReconciliationEntry, ReconciliationStore};
use tracing::debug;

/// What the poll loop must do with an incident this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Older than the retention horizon; never tracked.
    Skip,
    /// Everything in the snapshot was already delivered.
    NoOp,
    Create {
        content: MessageContent,
    },
    Patch {
        message_id: String,
        content: MessageContent,
    },
    /// The tracked message is gone downstream and must be replaced.
    Recreate {
        previous_message_id: String,
        content: MessageContent,
    },
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::NoOp => "noop",
            Self::Create { .. } => "create",
            Self::Patch { .. } => "patch",
            Self::Recreate { .. } => "recreate",
        }
    }
}

/// Confirmed outcome of executing an [`Action`] against the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// A new message now mirrors the incident (create or recreate).
    Created { message_id: String },
    /// The tracked message was edited in place.
    Edited { message_id: String },
}

pub struct ReconcileEngine {
    store: ReconciliationStore,
    policy: ReconcilePolicy,
    render: RenderSettings,
}

impl ReconcileEngine {
    pub fn new(store: ReconciliationStore, policy: ReconcilePolicy, render: RenderSettings) -> Self {
        Self {
            store,
            policy,
            render,
        }
    }

    pub fn store(&self) -> &ReconciliationStore {
        &self.store
    }

    /// Sub-update ids in `incident` not yet delivered, or `None` when the
    /// incident has no entry.
    pub fn missing_update_ids(&self, incident: &Incident) -> Option<BTreeSet<String>> {
        let entry = self.store.get(&incident.id)?;
        Some(
            incident
                .update_ids()
                .into_iter()
                .filter(|id| !entry.delivered_update_ids.contains(id))
                .collect(),
        )
    }

    /// Decides the action for `incident` as of `now`.
    ///
    /// The only channel call made here is the existence probe for a tracked
    /// message that needs new content; a probe failure is returned so the
    /// incident is retried next cycle.
    pub async fn reconcile(
        &self,
        incident: &Incident,
        now: DateTime<Utc>,
        channel: &dyn MessageChannel,
    ) -> RelayResult<Action> {
        if is_past_retention(incident.created_at, now, self.policy.retention_horizon) {
            debug!(incident_id = %incident.id, "incident older than retention horizon");
            return Ok(Action::Skip);
        }

        let Some(entry) = self.store.get(&incident.id) else {
            debug!(incident_id = %incident.id, "no entry; creating message");
            return Ok(Action::Create {
                content: self.render(incident),
            });
        };

        let missing = self.missing_update_ids(incident).unwrap_or_default();
        let status_changed = self.policy.refresh_on_status_change
            && entry
                .delivered_status
                .is_some_and(|status| status != incident.status);
        if missing.is_empty() && !status_changed {
            return Ok(Action::NoOp);
        }
        debug!(
            incident_id = %incident.id,
            missing = missing.len(),
            status_changed,
            "incident needs delivery"
        );

        let message_id = entry.message_id.clone();
        if channel.exists(&message_id).await? {
            Ok(Action::Patch {
                message_id,
                content: self.render(incident),
            })
        } else {
            debug!(incident_id = %incident.id, %message_id, "tracked message is gone");
            Ok(Action::Recreate {
                previous_message_id: message_id,
                content: self.render(incident),
            })
        }
    }

    /// Records a confirmed delivery and persists it.
    ///
    /// A returned error means the snapshot write failed; the in-memory entry
    /// has still advanced.
    pub fn commit(&mut self, incident: &Incident, delivery: Delivery) -> RelayResult<()> {
        let current = incident.update_ids();
        let entry = match delivery {
            Delivery::Created { message_id } => ReconciliationEntry::new(
                incident.id.clone(),
                message_id,
                current,
                Some(incident.status),
            ),
            Delivery::Edited { message_id } => {
                let mut delivered = self
                    .store
                    .get(&incident.id)
                    .map(|entry| entry.delivered_update_ids.clone())
                    .unwrap_or_default();
                delivered.extend(current);
                ReconciliationEntry::new(
                    incident.id.clone(),
                    message_id,
                    delivered,
                    Some(incident.status),
                )
            }
        };
        self.store.put(entry)
    }

    fn render(&self, incident: &Incident) -> MessageContent {
        render_incident(incident, &self.render)
    }
}
