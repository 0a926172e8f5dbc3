//! Discord webhook client backing the relay's notification channel.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use relay_core::{
    http_retry::{is_retryable_status, parse_retry_after, retry_delay, truncate_for_error},
    ChannelOperation, HttpSettings, MessageChannel, MessageContent, RelayError, RelayResult,
    WebhookSettings,
};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::embed::embed_payload;

#[derive(Debug, Clone, Deserialize)]
struct WebhookMessageResponse {
    id: String,
}

/// Failures a webhook request may be repeated after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryScope {
    /// Rate limits, server errors, and transport failures.
    Idempotent,
    /// Only rate limits and connect failures; the request never reached Discord.
    Unprocessed,
}

#[derive(Clone)]
pub struct DiscordWebhookClient {
    http: reqwest::Client,
    webhook_url: Url,
    username: String,
    avatar_url: Option<String>,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl DiscordWebhookClient {
    pub fn new(webhook: &WebhookSettings, settings: HttpSettings) -> Result<Self> {
        let webhook_url = Url::parse(webhook.url.trim())
            .with_context(|| format!("invalid webhook url '{}'", webhook.url))?;
        if webhook_url.cannot_be_a_base() {
            bail!("webhook url '{}' cannot carry message paths", webhook.url);
        }
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("incident-relay"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(settings.request_timeout_ms.max(1)))
            .build()
            .context("failed to create discord webhook client")?;
        Ok(Self {
            http,
            webhook_url,
            username: webhook.username.trim().to_string(),
            avatar_url: webhook
                .avatar_url
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
            retry_max_attempts: settings.retry_max_attempts.max(1),
            retry_base_delay_ms: settings.retry_base_delay_ms.max(1),
        })
    }

    pub async fn post_message(&self, content: &MessageContent) -> Result<String> {
        let mut payload = json!({
            "username": self.username,
            "embeds": [embed_payload(content)],
        });
        if let Some(avatar_url) = self.avatar_url.as_deref() {
            payload["avatar_url"] = Value::String(avatar_url.to_string());
        }

        let response = self
            .send("execute webhook", RetryScope::Unprocessed, || {
                self.http
                    .post(self.webhook_url.clone())
                    .query(&[("wait", "true")])
                    .json(&payload)
            })
            .await?;
        let response = ensure_success("execute webhook", response).await?;
        let message: WebhookMessageResponse = response
            .json()
            .await
            .context("failed to decode discord execute webhook response")?;
        if message.id.trim().is_empty() {
            bail!("discord execute webhook response missing message id");
        }
        debug!(message_id = %message.id, "webhook message created");
        Ok(message.id)
    }

    pub async fn message_exists(&self, message_id: &str) -> Result<bool> {
        let url = self.message_url(message_id)?;
        let response = self
            .send("get webhook message", RetryScope::Idempotent, || {
                self.http.get(url.clone())
            })
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        ensure_success("get webhook message", response).await?;
        Ok(true)
    }

    pub async fn edit_message(&self, message_id: &str, content: &MessageContent) -> Result<()> {
        let url = self.message_url(message_id)?;
        let payload = json!({ "embeds": [embed_payload(content)] });
        let response = self
            .send("edit webhook message", RetryScope::Idempotent, || {
                self.http.patch(url.clone()).json(&payload)
            })
            .await?;
        ensure_success("edit webhook message", response).await?;
        debug!(%message_id, "webhook message edited");
        Ok(())
    }

    fn message_url(&self, message_id: &str) -> Result<Url> {
        let message_id = message_id.trim();
        if message_id.is_empty() {
            bail!("message id cannot be empty");
        }
        let mut url = self.webhook_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("webhook url cannot carry message paths"))?
            .pop_if_empty()
            .push("messages")
            .push(message_id);
        Ok(url)
    }

    /// Sends with retries allowed by `scope`; any other response is handed
    /// back to the caller.
    ///
    /// Executing a webhook is not idempotent: once a create may have been
    /// processed, repeating it can post a second message.
    async fn send<F>(
        &self,
        operation: &str,
        scope: RetryScope,
        mut builder: F,
    ) -> Result<reqwest::Response>
    where
        F: FnMut() -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let response = builder()
                .header("x-relay-retry-attempt", attempt.saturating_sub(1).to_string())
                .send()
                .await;
            match response {
                Ok(response) => {
                    let status = response.status();
                    let retryable = match scope {
                        RetryScope::Idempotent => is_retryable_status(status.as_u16()),
                        RetryScope::Unprocessed => status == StatusCode::TOO_MANY_REQUESTS,
                    };
                    if attempt < self.retry_max_attempts && retryable {
                        let retry_after = response
                            .headers()
                            .get(reqwest::header::RETRY_AFTER)
                            .and_then(|value| value.to_str().ok())
                            .and_then(parse_retry_after);
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            retry_after,
                        ))
                        .await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(error) => {
                    let retryable = match scope {
                        RetryScope::Idempotent => is_retryable_transport_error(&error),
                        RetryScope::Unprocessed => error.is_connect(),
                    };
                    if attempt < self.retry_max_attempts && retryable {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(error)
                        .with_context(|| format!("discord {operation} request failed"));
                }
            }
        }
    }
}

async fn ensure_success(operation: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!(
        "discord {operation} failed with status {}: {}",
        status.as_u16(),
        truncate_for_error(&body, 800)
    );
}

fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request() || error.is_body()
}

#[async_trait]
impl MessageChannel for DiscordWebhookClient {
    async fn create(&self, content: &MessageContent) -> RelayResult<String> {
        self.post_message(content)
            .await
            .map_err(|error| RelayError::channel(ChannelOperation::Create, error))
    }

    async fn exists(&self, message_id: &str) -> RelayResult<bool> {
        self.message_exists(message_id)
            .await
            .map_err(|error| RelayError::channel(ChannelOperation::Fetch, error))
    }

    async fn edit(&self, message_id: &str, content: &MessageContent) -> RelayResult<()> {
        self.edit_message(message_id, content)
            .await
            .map_err(|error| RelayError::channel(ChannelOperation::Edit, error))
    }
}
