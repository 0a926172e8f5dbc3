//! HTTP client polling a Statuspage incidents feed.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use relay_core::{
    http_retry::{is_retryable_status, parse_retry_after, retry_delay, truncate_for_error},
    HttpSettings, Incident, IncidentSource, RelayError, RelayResult,
};
use serde_json::Value;
use tracing::debug;

use crate::feed::parse_incidents_payload;

#[derive(Clone)]
pub struct StatuspageClient {
    http: reqwest::Client,
    feed_url: String,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl StatuspageClient {
    pub fn new(feed_url: String, settings: HttpSettings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("incident-relay"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.request_timeout_ms.max(1)))
            .build()
            .context("failed to create statuspage client")?;
        Ok(Self {
            http,
            feed_url: feed_url.trim().to_string(),
            retry_max_attempts: settings.retry_max_attempts.max(1),
            retry_base_delay_ms: settings.retry_base_delay_ms.max(1),
        })
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// Fetches and decodes the current incident list.
    pub async fn fetch_feed(&self) -> Result<Vec<Incident>> {
        debug!(url = %self.feed_url, "fetching incident feed");
        let payload = self.request_json().await?;
        parse_incidents_payload(&payload).map_err(|reason| anyhow!(reason))
    }

    async fn request_json(&self) -> Result<Value> {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            match self.http.get(&self.feed_url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response
                            .json::<Value>()
                            .await
                            .context("failed to decode incident feed");
                    }
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|value| value.to_str().ok())
                        .and_then(parse_retry_after);
                    let body = response.text().await.unwrap_or_default();
                    if attempt < self.retry_max_attempts && is_retryable_status(status.as_u16()) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    bail!(
                        "incident feed request failed with status {}: {}",
                        status.as_u16(),
                        truncate_for_error(&body, 400)
                    );
                }
                Err(error) => {
                    if attempt < self.retry_max_attempts && is_retryable_transport_error(&error) {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error).context("incident feed request failed");
                }
            }
        }
    }
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

#[async_trait]
impl IncidentSource for StatuspageClient {
    async fn fetch_incidents(&self) -> RelayResult<Vec<Incident>> {
        self.fetch_feed().await.map_err(RelayError::source_fetch)
    }
}
