use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use relay_core::RelayConfig;
use relay_discord::DiscordWebhookClient;
use relay_runtime::{PollCycleReport, PollLoop, PollLoopConfig, ReconcileEngine};
use relay_statuspage::StatuspageClient;
use relay_store::{read_snapshot, ReconciliationStore};
use tokio::sync::watch;
use tracing::{info, warn};

pub fn build_poll_loop(config: &RelayConfig) -> Result<PollLoop> {
    config.validate()?;
    let source = StatuspageClient::new(config.feed_url.clone(), config.http)?;
    let channel = DiscordWebhookClient::new(&config.webhook, config.http)?;
    let store = ReconciliationStore::load(config.state_path.clone());
    let engine = ReconcileEngine::new(store, config.policy, config.render);
    Ok(PollLoop::new(
        Arc::new(source),
        Arc::new(channel),
        engine,
        PollLoopConfig {
            poll_interval: config.poll_interval,
            fetch_retry_delay: config.fetch_retry_delay,
        },
    ))
}

/// Polls until Ctrl-C.
pub async fn run_relay(config: &RelayConfig) -> Result<()> {
    let mut poll_loop = build_poll_loop(config)?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                let _ = shutdown_tx.send(true);
            }
            Err(error) => {
                warn!(%error, "failed to listen for ctrl-c; relay must be killed to stop");
                std::future::pending::<()>().await;
            }
        }
    });
    poll_loop.run(shutdown_rx).await;
    signal.abort();
    Ok(())
}

pub async fn run_once(config: &RelayConfig) -> Result<PollCycleReport> {
    let mut poll_loop = build_poll_loop(config)?;
    let report = poll_loop.run_cycle().await?;
    Ok(report)
}

/// Renders the persisted entries as a pretty JSON array.
pub fn inspect_store(state_path: &Path) -> Result<String> {
    let entries = read_snapshot(state_path)?.unwrap_or_default();
    let records = entries.values().collect::<Vec<_>>();
    serde_json::to_string_pretty(&records).context("failed to encode reconciliation entries")
}

#[cfg(test)]
mod tests;
