use std::{path::PathBuf, time::Duration};

use clap::{ArgAction, Parser, Subcommand};
use relay_core::{
    parse_color, retention_days, HttpSettings, ReconcilePolicy, RelayConfig, RenderSettings,
    StatusColors, TimestampFormat, WebhookSettings, DEFAULT_FEED_URL, DEFAULT_STATE_PATH,
    DEFAULT_WEBHOOK_USERNAME,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Subcommand)]
pub enum CliCommand {
    /// Poll the feed on a fixed interval until interrupted.
    #[default]
    Run,
    /// Run a single reconciliation cycle and print its report as JSON.
    Once,
    /// Print the persisted reconciliation entries as JSON.
    Inspect,
}

#[derive(Debug, Parser)]
#[command(
    name = "incident-relay",
    about = "Mirrors status-page incidents into a Discord webhook channel",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,

    #[arg(
        long = "feed-url",
        env = "RELAY_FEED_URL",
        default_value = DEFAULT_FEED_URL,
        help = "Statuspage incidents.json endpoint to poll"
    )]
    pub feed_url: String,

    #[arg(
        long = "webhook-url",
        env = "RELAY_WEBHOOK_URL",
        default_value = "",
        hide_env_values = true,
        help = "Discord webhook URL incidents are mirrored into (required for run and once)"
    )]
    pub webhook_url: String,

    #[arg(
        long = "webhook-username",
        env = "RELAY_WEBHOOK_USERNAME",
        default_value = DEFAULT_WEBHOOK_USERNAME,
        help = "Display name used for webhook messages"
    )]
    pub webhook_username: String,

    #[arg(
        long = "webhook-avatar-url",
        env = "RELAY_WEBHOOK_AVATAR_URL",
        help = "Optional avatar URL for webhook messages"
    )]
    pub webhook_avatar_url: Option<String>,

    #[arg(
        long = "state-path",
        env = "RELAY_STATE_PATH",
        default_value = DEFAULT_STATE_PATH,
        help = "Reconciliation snapshot file"
    )]
    pub state_path: PathBuf,

    #[arg(
        long = "retention-days",
        env = "RELAY_RETENTION_DAYS",
        default_value_t = 30,
        value_parser = parse_positive_u64,
        help = "Incidents created longer ago than this are not tracked"
    )]
    pub retention_days: u64,

    #[arg(
        long = "poll-interval-seconds",
        env = "RELAY_POLL_INTERVAL_SECONDS",
        default_value_t = 60,
        value_parser = parse_positive_u64,
        help = "Delay between reconciliation cycles"
    )]
    pub poll_interval_seconds: u64,

    #[arg(
        long = "fetch-retry-delay-seconds",
        env = "RELAY_FETCH_RETRY_DELAY_SECONDS",
        default_value_t = 60,
        value_parser = parse_positive_u64,
        help = "Delay before retrying after the feed could not be fetched"
    )]
    pub fetch_retry_delay_seconds: u64,

    #[arg(
        long = "refresh-on-status-change",
        env = "RELAY_REFRESH_ON_STATUS_CHANGE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Edit the message when the incident status changes even without new updates"
    )]
    pub refresh_on_status_change: bool,

    #[arg(long = "color-resolved", env = "RELAY_COLOR_RESOLVED", default_value = "06a51b", value_parser = parse_color)]
    pub color_resolved: u32,

    #[arg(long = "color-monitoring", env = "RELAY_COLOR_MONITORING", default_value = "a3a506", value_parser = parse_color)]
    pub color_monitoring: u32,

    #[arg(long = "color-identified", env = "RELAY_COLOR_IDENTIFIED", default_value = "a55806", value_parser = parse_color)]
    pub color_identified: u32,

    #[arg(long = "color-investigating", env = "RELAY_COLOR_INVESTIGATING", default_value = "a50626", value_parser = parse_color)]
    pub color_investigating: u32,

    #[arg(long = "color-other", env = "RELAY_COLOR_OTHER", default_value = "a506a3", value_parser = parse_color)]
    pub color_other: u32,

    #[arg(
        long = "timestamp-format",
        env = "RELAY_TIMESTAMP_FORMAT",
        default_value = "R",
        help = "Discord timestamp style for update headings: none, t, T, d, D, f, F, or R"
    )]
    pub timestamp_format: TimestampFormat,

    #[arg(
        long = "request-timeout-ms",
        env = "RELAY_REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Per-request HTTP timeout for the feed and webhook"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "RELAY_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per HTTP request before giving up for the cycle"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "RELAY_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential HTTP retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "log-file",
        env = "RELAY_LOG_FILE",
        help = "Write logs to this file instead of stderr"
    )]
    pub log_file: Option<PathBuf>,

    #[arg(
        long = "log-file-append",
        env = "RELAY_LOG_FILE_APPEND",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Append to --log-file instead of truncating it at startup"
    )]
    pub log_file_append: bool,
}

impl Cli {
    pub fn command(&self) -> CliCommand {
        self.command.unwrap_or_default()
    }

    /// Builds the relay configuration; validation is left to the caller.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            feed_url: self.feed_url.trim().to_string(),
            webhook: WebhookSettings {
                url: self.webhook_url.trim().to_string(),
                username: self.webhook_username.clone(),
                avatar_url: self.webhook_avatar_url.clone(),
            },
            state_path: self.state_path.clone(),
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            fetch_retry_delay: Duration::from_secs(self.fetch_retry_delay_seconds),
            policy: ReconcilePolicy {
                retention_horizon: retention_days(self.retention_days),
                refresh_on_status_change: self.refresh_on_status_change,
            },
            render: RenderSettings {
                colors: StatusColors {
                    resolved: self.color_resolved,
                    monitoring: self.color_monitoring,
                    identified: self.color_identified,
                    investigating: self.color_investigating,
                    other: self.color_other,
                },
                timestamp_format: self.timestamp_format,
            },
            http: HttpSettings {
                request_timeout_ms: self.request_timeout_ms,
                retry_max_attempts: self.retry_max_attempts,
                retry_base_delay_ms: self.retry_base_delay_ms,
            },
        }
    }
}
