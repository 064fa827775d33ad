//! NotificationSweeper - Background retry and retention for notifications.
//!
//! Redelivery by the provider is the primary retry path. The sweeper covers
//! notifications the provider gave up on: unprocessed rows whose claim has
//! lapsed are replayed from their stored payload, bypassing authentication
//! and decoding.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `poll_interval` | 60s | How often to sweep |
//! | `batch_size` | 50 | Max notifications replayed per sweep |
//! | `claim_lease` | 300s | Age after which a claim is considered abandoned |
//! | `max_attempts` | 10 | Attempts before a row is recorded as an anomaly |
//! | `retention` | 30 days | Processed rows older than this are purged |
//!
//! ## Graceful Shutdown
//!
//! Listens on a watch channel and finishes the current sweep before
//! stopping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{NotificationOutcome, ProcessedNotificationStore};

use super::{ReconcileNotificationHandler, ReconcileNotificationResult};

/// Configuration for the NotificationSweeper.
#[derive(Debug, Clone)]
pub struct NotificationSweeperConfig {
    pub poll_interval: Duration,
    pub batch_size: u32,
    pub claim_lease: Duration,
    pub max_attempts: u32,

    /// `None` disables purging.
    pub retention: Option<Duration>,
}

impl Default for NotificationSweeperConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            batch_size: 50,
            claim_lease: Duration::from_secs(300),
            max_attempts: 10,
            retention: Some(Duration::from_secs(30 * 24 * 60 * 60)),
        }
    }
}

impl NotificationSweeperConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, size: u32) -> Self {
        self.batch_size = size;
        self
    }

    pub fn with_claim_lease(mut self, lease: Duration) -> Self {
        self.claim_lease = lease;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_retention(mut self, retention: Option<Duration>) -> Self {
        self.retention = retention;
        self
    }
}

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub reconciled: usize,
    pub failed: usize,
    pub abandoned: usize,
    pub purged: u64,
}

pub struct NotificationSweeper {
    notifications: Arc<dyn ProcessedNotificationStore>,
    handler: Arc<ReconcileNotificationHandler>,
    config: NotificationSweeperConfig,
}

impl NotificationSweeper {
    pub fn new(
        notifications: Arc<dyn ProcessedNotificationStore>,
        handler: Arc<ReconcileNotificationHandler>,
        config: NotificationSweeperConfig,
    ) -> Self {
        Self {
            notifications,
            handler,
            config,
        }
    }

    /// Runs the sweep loop until shutdown is signalled.
    ///
    /// A failed sweep is logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Notification sweeper stopping");
                        return;
                    }
                }

                _ = interval.tick() => {
                    match self.process_batch().await {
                        Ok(report) if report != SweepReport::default() => {
                            tracing::info!(
                                reconciled = report.reconciled,
                                failed = report.failed,
                                abandoned = report.abandoned,
                                purged = report.purged,
                                "Notification sweep complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Notification sweep failed"),
                    }
                }
            }
        }
    }

    /// Runs one sweep: replay lapsed notifications, then purge old rows.
    pub async fn process_batch(&self) -> Result<SweepReport, DomainError> {
        let now = Timestamp::now();
        let lapsed_before = now.minus_secs(self.config.claim_lease.as_secs());
        let records = self
            .notifications
            .find_retryable(lapsed_before, self.config.batch_size)
            .await?;

        let mut report = SweepReport::default();
        for record in records {
            if record.attempts >= self.config.max_attempts {
                let reason = format!(
                    "gave up after {} attempts: {}",
                    record.attempts,
                    record.last_error.as_deref().unwrap_or("claim lapsed")
                );
                tracing::warn!(
                    notification_id = %record.notification_id,
                    attempts = record.attempts,
                    "Abandoning notification"
                );
                self.notifications
                    .mark_processed(
                        &record.notification_id,
                        NotificationOutcome::Anomaly,
                        Some(&reason),
                        now,
                    )
                    .await?;
                report.abandoned += 1;
                continue;
            }

            match self.handler.reconcile(record.payload).await {
                Ok(ReconcileNotificationResult::Duplicate { .. }) => {}
                Ok(_) => report.reconciled += 1,
                Err(_) => report.failed += 1,
            }
        }

        if let Some(retention) = self.config.retention {
            let cutoff = now.minus_secs(retention.as_secs());
            report.purged = self.notifications.delete_processed_before(cutoff).await?;
        }

        Ok(report)
    }

    /// Runs exactly one sweep (for testing).
    pub async fn poll_once(&self) -> Result<SweepReport, DomainError> {
        self.process_batch().await
    }
}
