//! Fixed-interval driver running one reconciliation pass per cycle.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use relay_core::{Incident, IncidentSource, MessageChannel, RelayResult};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::engine::{Action, Delivery, ReconcileEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollLoopConfig {
    pub poll_interval: Duration,
    /// Wait before retrying after the feed could not be fetched.
    pub fetch_retry_delay: Duration,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PollCycleReport {
    pub fetched_incidents: usize,
    pub skipped_stale: usize,
    pub unchanged: usize,
    pub created: usize,
    pub patched: usize,
    pub recreated: usize,
    pub failed: usize,
    pub store_write_failures: usize,
}

impl PollCycleReport {
    pub fn has_activity(&self) -> bool {
        self.created > 0
            || self.patched > 0
            || self.recreated > 0
            || self.failed > 0
            || self.store_write_failures > 0
    }

    fn record(&mut self, action: &Action) {
        match action {
            Action::Skip => self.skipped_stale += 1,
            Action::NoOp => self.unchanged += 1,
            Action::Create { .. } => self.created += 1,
            Action::Patch { .. } => self.patched += 1,
            Action::Recreate { .. } => self.recreated += 1,
        }
    }
}

/// Sole owner of the engine; the only caller of channel writes.
pub struct PollLoop {
    source: Arc<dyn IncidentSource>,
    channel: Arc<dyn MessageChannel>,
    engine: ReconcileEngine,
    config: PollLoopConfig,
}

impl PollLoop {
    pub fn new(
        source: Arc<dyn IncidentSource>,
        channel: Arc<dyn MessageChannel>,
        engine: ReconcileEngine,
        config: PollLoopConfig,
    ) -> Self {
        Self {
            source,
            channel,
            engine,
            config,
        }
    }

    pub fn engine(&self) -> &ReconcileEngine {
        &self.engine
    }

    /// Runs cycles until `shutdown` flips to true or its sender is dropped.
    ///
    /// A shutdown signal abandons an in-flight cycle at its next await point;
    /// store writes are per incident, so at most that incident's action is
    /// left incomplete.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            entries = self.engine.store().len(),
            "incident relay poll loop started"
        );
        let PollLoopConfig {
            poll_interval,
            fetch_retry_delay,
        } = self.config;
        loop {
            if *shutdown.borrow() {
                break;
            }
            let delay = tokio::select! {
                result = self.run_cycle() => match result {
                    Ok(_) => poll_interval,
                    Err(error) => {
                        warn!(%error, "skipping cycle; incident feed unavailable");
                        fetch_retry_delay
                    }
                },
                _ = shutdown.changed() => {
                    info!("shutdown requested; abandoning current cycle");
                    break;
                }
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {}
            }
        }
        info!("incident relay poll loop stopped");
    }

    pub async fn run_cycle(&mut self) -> RelayResult<PollCycleReport> {
        self.run_cycle_at(Utc::now()).await
    }

    /// One pass over the feed, oldest incident first.
    ///
    /// Only a feed failure fails the cycle; per-incident failures are logged,
    /// counted, and retried next cycle.
    pub async fn run_cycle_at(&mut self, now: DateTime<Utc>) -> RelayResult<PollCycleReport> {
        let mut incidents = self.source.fetch_incidents().await?;
        incidents.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });

        let mut report = PollCycleReport {
            fetched_incidents: incidents.len(),
            ..PollCycleReport::default()
        };
        for incident in &incidents {
            match self.process_incident(incident, now, &mut report).await {
                Ok(action) => report.record(&action),
                Err(error) => {
                    report.failed += 1;
                    error!(incident_id = %incident.id, %error, "incident reconciliation failed");
                }
            }
        }

        if report.has_activity() {
            info!(
                fetched = report.fetched_incidents,
                created = report.created,
                patched = report.patched,
                recreated = report.recreated,
                unchanged = report.unchanged,
                stale = report.skipped_stale,
                failed = report.failed,
                store_write_failures = report.store_write_failures,
                "incident relay cycle"
            );
        } else {
            debug!(fetched = report.fetched_incidents, "incident relay cycle idle");
        }
        Ok(report)
    }

    async fn process_incident(
        &mut self,
        incident: &Incident,
        now: DateTime<Utc>,
        report: &mut PollCycleReport,
    ) -> RelayResult<Action> {
        let action = self
            .engine
            .reconcile(incident, now, self.channel.as_ref())
            .await?;
        let Some(delivery) = self.deliver(&action).await? else {
            return Ok(action);
        };
        info!(
            incident_id = %incident.id,
            action = action.label(),
            message_id = delivery_message_id(&delivery),
            "incident delivered"
        );
        if let Err(error) = self.engine.commit(incident, delivery) {
            report.store_write_failures += 1;
            error!(incident_id = %incident.id, %error, "delivery recorded in memory only");
        }
        Ok(action)
    }

    async fn deliver(&self, action: &Action) -> RelayResult<Option<Delivery>> {
        match action {
            Action::Skip | Action::NoOp => Ok(None),
            Action::Create { content } => {
                let message_id = self.channel.create(content).await?;
                Ok(Some(Delivery::Created { message_id }))
            }
            Action::Recreate {
                previous_message_id,
                content,
            } => {
                warn!(%previous_message_id, "tracked message missing downstream; posting replacement");
                let message_id = self.channel.create(content).await?;
                Ok(Some(Delivery::Created { message_id }))
            }
            Action::Patch {
                message_id,
                content,
            } => {
                self.channel.edit(message_id, content).await?;
                Ok(Some(Delivery::Edited {
                    message_id: message_id.clone(),
                }))
            }
        }
    }
}

fn delivery_message_id(delivery: &Delivery) -> &str {
    match delivery {
        Delivery::Created { message_id } | Delivery::Edited { message_id } => message_id,
    }
}
