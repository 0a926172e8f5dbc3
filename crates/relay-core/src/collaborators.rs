//! Seams between the reconciliation core and its I/O collaborators.

use async_trait::async_trait;

use crate::{Incident, MessageContent, RelayResult};

/// Supplies the current incident snapshots on every poll.
#[async_trait]
pub trait IncidentSource: Send + Sync {
    async fn fetch_incidents(&self) -> RelayResult<Vec<Incident>>;
}

/// Downstream channel holding one message per incident.
///
/// Implementations own their retry and timeout handling; errors returned here
/// are final for the current cycle.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Posts a new message and returns its identifier.
    async fn create(&self, content: &MessageContent) -> RelayResult<String>;

    /// Reports whether a previously created message can still be fetched.
    async fn exists(&self, message_id: &str) -> RelayResult<bool>;

    /// Replaces the content of an existing message.
    async fn edit(&self, message_id: &str, content: &MessageContent) -> RelayResult<()>;
}
