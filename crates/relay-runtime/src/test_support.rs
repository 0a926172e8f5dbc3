//! In-memory collaborators shared by engine and poll loop tests.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use relay_core::{
    ChannelOperation, Incident, IncidentSource, IncidentStatus, IncidentUpdate, MessageChannel,
    MessageContent, RelayError, RelayResult,
};

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 30, 12, 0, 0).unwrap()
}

pub(crate) fn incident(id: &str, age_days: i64, update_ids: &[&str]) -> Incident {
    let created_at = fixed_now() - Duration::days(age_days);
    Incident {
        id: id.to_string(),
        name: format!("Incident {id}"),
        status: IncidentStatus::Investigating,
        created_at,
        impact: Some("minor".to_string()),
        shortlink: None,
        components: vec!["API".to_string()],
        updates: update_ids
            .iter()
            .enumerate()
            .map(|(index, update_id)| IncidentUpdate {
                id: update_id.to_string(),
                status: "investigating".to_string(),
                body: format!("update {update_id}"),
                created_at: created_at + Duration::minutes(index as i64),
            })
            .collect(),
    }
}

#[derive(Default)]
struct FakeChannelState {
    messages: BTreeMap<String, MessageContent>,
    next_id: u64,
    created: Vec<String>,
    edited: Vec<String>,
    probed: Vec<String>,
    fail_create: bool,
    fail_edit: bool,
    fail_probe: bool,
    delete_after_exists: bool,
}

/// Channel that keeps messages in memory and numbers them M1, M2, ...
#[derive(Default)]
pub(crate) struct FakeChannel {
    state: Mutex<FakeChannelState>,
}

impl FakeChannel {
    pub(crate) fn delete(&self, message_id: &str) {
        self.state.lock().unwrap().messages.remove(message_id);
    }

    pub(crate) fn message(&self, message_id: &str) -> Option<MessageContent> {
        self.state.lock().unwrap().messages.get(message_id).cloned()
    }

    pub(crate) fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub(crate) fn edited(&self) -> Vec<String> {
        self.state.lock().unwrap().edited.clone()
    }

    pub(crate) fn probed(&self) -> Vec<String> {
        self.state.lock().unwrap().probed.clone()
    }

    pub(crate) fn set_fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    pub(crate) fn set_fail_edit(&self, fail: bool) {
        self.state.lock().unwrap().fail_edit = fail;
    }

    pub(crate) fn set_fail_probe(&self, fail: bool) {
        self.state.lock().unwrap().fail_probe = fail;
    }

    /// Deletes a message right after `exists` reports it present.
    pub(crate) fn set_delete_after_exists(&self, delete: bool) {
        self.state.lock().unwrap().delete_after_exists = delete;
    }
}

#[async_trait]
impl MessageChannel for FakeChannel {
    async fn create(&self, content: &MessageContent) -> RelayResult<String> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(RelayError::channel(ChannelOperation::Create, "status 500"));
        }
        state.next_id += 1;
        let message_id = format!("M{}", state.next_id);
        state.messages.insert(message_id.clone(), content.clone());
        state.created.push(message_id.clone());
        Ok(message_id)
    }

    async fn exists(&self, message_id: &str) -> RelayResult<bool> {
        let mut state = self.state.lock().unwrap();
        if state.fail_probe {
            return Err(RelayError::channel(ChannelOperation::Fetch, "status 502"));
        }
        state.probed.push(message_id.to_string());
        let present = state.messages.contains_key(message_id);
        if present && state.delete_after_exists {
            state.messages.remove(message_id);
        }
        Ok(present)
    }

    async fn edit(&self, message_id: &str, content: &MessageContent) -> RelayResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_edit {
            return Err(RelayError::channel(ChannelOperation::Edit, "status 500"));
        }
        match state.messages.get_mut(message_id) {
            Some(existing) => {
                *existing = content.clone();
                state.edited.push(message_id.to_string());
                Ok(())
            }
            None => Err(RelayError::channel(ChannelOperation::Edit, "status 404")),
        }
    }
}

/// Source replaying queued poll results; repeats the last one once drained.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    polls: Mutex<VecDeque<RelayResult<Vec<Incident>>>>,
    last: Mutex<Vec<Incident>>,
}

impl ScriptedSource {
    pub(crate) fn push(&self, incidents: Vec<Incident>) {
        self.polls.lock().unwrap().push_back(Ok(incidents));
    }

    pub(crate) fn push_error(&self, reason: &str) {
        self.polls
            .lock()
            .unwrap()
            .push_back(Err(RelayError::SourceFetch(reason.to_string())));
    }
}

#[async_trait]
impl IncidentSource for ScriptedSource {
    async fn fetch_incidents(&self) -> RelayResult<Vec<Incident>> {
        let next = self.polls.lock().unwrap().pop_front();
        match next {
            Some(Ok(incidents)) => {
                *self.last.lock().unwrap() = incidents.clone();
                Ok(incidents)
            }
            Some(Err(error)) => Err(error),
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}
