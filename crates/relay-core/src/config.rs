//! Immutable runtime configuration shared by the engine, loop, and collaborators.

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{IncidentStatus, RelayError, RelayResult};

pub const DEFAULT_FEED_URL: &str = "https://discordstatus.com/api/v2/incidents.json";
pub const DEFAULT_WEBHOOK_USERNAME: &str = "Status";
pub const DEFAULT_STATE_PATH: &str = ".incident-relay/cache.json";
pub const DEFAULT_RETENTION_DAYS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 60;

const SECONDS_PER_DAY: u64 = 60 * 60 * 24;

/// Embed color per incident status, as 24-bit RGB values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusColors {
    pub resolved: u32,
    pub monitoring: u32,
    pub identified: u32,
    pub investigating: u32,
    pub other: u32,
}

impl Default for StatusColors {
    fn default() -> Self {
        Self {
            resolved: 0x06a51b,
            monitoring: 0xa3a506,
            identified: 0xa55806,
            investigating: 0xa50626,
            other: 0xa506a3,
        }
    }
}

impl StatusColors {
    pub fn for_status(&self, status: IncidentStatus) -> u32 {
        match status {
            IncidentStatus::Resolved => self.resolved,
            IncidentStatus::Monitoring => self.monitoring,
            IncidentStatus::Identified => self.identified,
            IncidentStatus::Investigating => self.investigating,
            IncidentStatus::Other => self.other,
        }
    }
}

/// Parses `#06a51b`, `0x06a51b`, or `06a51b` into an RGB color.
pub fn parse_color(value: &str) -> Result<u32, String> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() || digits.len() > 6 {
        return Err(format!("color '{value}' must have 1 to 6 hex digits"));
    }
    u32::from_str_radix(digits, 16).map_err(|error| format!("invalid color '{value}': {error}"))
}

/// Discord timestamp markup style appended to `<t:UNIX...>` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// Client default, e.g. "28 November 2018 09:01".
    Default,
    ShortTime,
    LongTime,
    ShortDate,
    LongDate,
    ShortDateTime,
    LongDateTime,
    #[default]
    Relative,
}

impl TimestampFormat {
    /// Suffix placed after the unix seconds inside a timestamp marker.
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::ShortTime => ":t",
            Self::LongTime => ":T",
            Self::ShortDate => ":d",
            Self::LongDate => ":D",
            Self::ShortDateTime => ":f",
            Self::LongDateTime => ":F",
            Self::Relative => ":R",
        }
    }
}

impl FromStr for TimestampFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let style = trimmed.strip_prefix(':').unwrap_or(trimmed);
        match style {
            "" | "none" | "default" => Ok(Self::Default),
            "t" => Ok(Self::ShortTime),
            "T" => Ok(Self::LongTime),
            "d" => Ok(Self::ShortDate),
            "D" => Ok(Self::LongDate),
            "f" => Ok(Self::ShortDateTime),
            "F" => Ok(Self::LongDateTime),
            "R" => Ok(Self::Relative),
            other => Err(format!(
                "unsupported timestamp format '{other}' (expected one of none, t, T, d, D, f, F, R)"
            )),
        }
    }
}

impl fmt::Display for TimestampFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = self.suffix().trim_start_matches(':');
        if style.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(style)
        }
    }
}

/// How reconciled incidents are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSettings {
    pub colors: StatusColors,
    pub timestamp_format: TimestampFormat,
}

/// Policy knobs for the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilePolicy {
    /// Incidents older than this are never tracked.
    pub retention_horizon: Duration,
    /// Re-deliver when the incident status changed even without new updates.
    pub refresh_on_status_change: bool,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            retention_horizon: Duration::from_secs(DEFAULT_RETENTION_DAYS * SECONDS_PER_DAY),
            refresh_on_status_change: false,
        }
    }
}

/// Identity the webhook posts under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub url: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// HTTP behavior shared by the feed client and the webhook client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

/// Full relay configuration, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub feed_url: String,
    pub webhook: WebhookSettings,
    pub state_path: PathBuf,
    pub poll_interval: Duration,
    pub fetch_retry_delay: Duration,
    pub policy: ReconcilePolicy,
    pub render: RenderSettings,
    pub http: HttpSettings,
}

impl RelayConfig {
    /// Config with defaults everywhere except the required webhook URL.
    pub fn with_webhook_url(url: impl Into<String>) -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            webhook: WebhookSettings {
                url: url.into(),
                username: DEFAULT_WEBHOOK_USERNAME.to_string(),
                avatar_url: None,
            },
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
            fetch_retry_delay: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECONDS),
            policy: ReconcilePolicy::default(),
            render: RenderSettings::default(),
            http: HttpSettings::default(),
        }
    }

    /// Rejects configurations the relay cannot start with.
    pub fn validate(&self) -> RelayResult<()> {
        if self.webhook.url.trim().is_empty() {
            return Err(RelayError::Config("webhook url is required".to_string()));
        }
        if !is_http_url(&self.webhook.url) {
            return Err(RelayError::Config(format!(
                "webhook url '{}' must start with http:// or https://",
                self.webhook.url
            )));
        }
        if !is_http_url(&self.feed_url) {
            return Err(RelayError::Config(format!(
                "feed url '{}' must start with http:// or https://",
                self.feed_url
            )));
        }
        if self.webhook.username.trim().is_empty() {
            return Err(RelayError::Config(
                "webhook username cannot be empty".to_string(),
            ));
        }
        if self.state_path.as_os_str().is_empty() {
            return Err(RelayError::Config("state path cannot be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(RelayError::Config(
                "poll interval must be greater than 0".to_string(),
            ));
        }
        if self.policy.retention_horizon.is_zero() {
            return Err(RelayError::Config(
                "retention horizon must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Converts a day count into a retention horizon.
pub fn retention_days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY))
}

fn is_http_url(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.starts_with("https://") || trimmed.starts_with("http://")
}
