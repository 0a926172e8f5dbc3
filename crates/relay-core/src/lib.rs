//! Shared domain types for the incident relay.
//!
//! Holds the incident model, configuration, failure taxonomy, the traits the
//! reconciliation core uses to reach its feed and channel collaborators, and
//! the renderer that turns an incident into message content.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod http_retry;
pub mod incident;
pub mod render;
pub mod time_utils;

pub use collaborators::{IncidentSource, MessageChannel};
pub use config::{
    parse_color, retention_days, HttpSettings, ReconcilePolicy, RelayConfig, RenderSettings,
    StatusColors, TimestampFormat, WebhookSettings, DEFAULT_FEED_URL, DEFAULT_POLL_INTERVAL_SECONDS,
    DEFAULT_RETENTION_DAYS, DEFAULT_STATE_PATH, DEFAULT_WEBHOOK_USERNAME,
};
pub use error::{ChannelOperation, RelayError, RelayResult};
pub use incident::{Incident, IncidentStatus, IncidentUpdate};
pub use render::{render_incident, MessageContent, MessageField, FIELD_VALUE_MAX_CHARS};
pub use time_utils::{age_at, is_past_retention};
