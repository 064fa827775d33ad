//! ReconcileNotificationHandler - Command handler for renewal notifications.
//!
//! Pipeline: decode → idempotency guard → provider fetch → state machine →
//! ledger writer → mark processed → audit.
//!
//! When the ledger commits an effect it marks the notification processed in
//! the same unit of work; the handler marks it only for outcomes that leave
//! the ledger untouched.
//!
//! ## Failure Handling
//!
//! | Failure | Claim | Processed | Result |
//! |---------|-------|-----------|--------|
//! | Decode | never taken | no | `Decode` (400) |
//! | Fetch / ledger / database | released | no | retryable (500) |
//! | Business anomaly | cleared | yes, `anomaly` | acknowledged (200) |
//! | Duplicate | untouched | - | acknowledged (200) |

use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{
    transition, Disposition, FetchError, PaymentHistory, ProviderSubscriptionSnapshot,
    RecurringStatus, RenewalEvent, Subscription, WebhookError,
};
use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::ports::{
    AdmitResult, AuditEntry, AuditSink, CommitResult, DecodedNotification, InboundMessage,
    NotificationDecoder, NotificationOutcome, ProcessedNotification, ProcessedNotificationStore,
    SubscriptionLedger, SubscriptionStateFetcher,
};

/// Command to reconcile one pushed notification.
#[derive(Debug, Clone)]
pub struct ReconcileNotificationCommand {
    pub message: InboundMessage,
}

/// Result of reconciling a notification. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileNotificationResult {
    /// The state machine ran and its outcome was recorded.
    Reconciled {
        notification_id: Option<String>,
        subscription_id: Option<SubscriptionId>,
        recurring_status: Option<RecurringStatus>,
        disposition: Disposition,
    },

    /// Already processed, or being processed by another delivery.
    Duplicate { notification_id: String },

    /// Console test publish.
    TestNotification,

    /// A notification kind this service does not reconcile.
    Unsupported { kind: String },
}

/// Time budgets for the handler's suspension points.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    /// Upper bound on the provider query.
    pub fetch_timeout: Duration,

    /// Upper bound on the ledger transaction.
    pub ledger_timeout: Duration,

    /// How long a claim blocks redelivery before it may be taken over.
    pub claim_lease: Duration,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            ledger_timeout: Duration::from_secs(5),
            claim_lease: Duration::from_secs(300),
        }
    }
}

/// Handler for renewal notifications.
///
/// Notifications are hints: the provider is queried for every one and all
/// written values come from that snapshot.
pub struct ReconcileNotificationHandler {
    decoder: Arc<dyn NotificationDecoder>,
    fetcher: Arc<dyn SubscriptionStateFetcher>,
    notifications: Arc<dyn ProcessedNotificationStore>,
    ledger: Arc<dyn SubscriptionLedger>,
    audit: Arc<dyn AuditSink>,
    settings: ReconcileSettings,
}

impl ReconcileNotificationHandler {
    pub fn new(
        decoder: Arc<dyn NotificationDecoder>,
        fetcher: Arc<dyn SubscriptionStateFetcher>,
        notifications: Arc<dyn ProcessedNotificationStore>,
        ledger: Arc<dyn SubscriptionLedger>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            decoder,
            fetcher,
            notifications,
            ledger,
            audit,
            settings: ReconcileSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ReconcileSettings) -> Self {
        self.settings = settings;
        self
    }

    pub async fn handle(
        &self,
        cmd: ReconcileNotificationCommand,
    ) -> Result<ReconcileNotificationResult, WebhookError> {
        let decoded = match self.decoder.decode(&cmd.message) {
            Ok(decoded) => decoded,
            Err(err) => {
                tracing::warn!(
                    error_kind = "decode_failure",
                    message_id = cmd.message.message_id.as_deref().unwrap_or("-"),
                    error = %err,
                    "Rejected undecodable notification"
                );
                return Err(WebhookError::Decode(err));
            }
        };

        match decoded {
            DecodedNotification::Test => {
                tracing::info!(
                    message_id = cmd.message.message_id.as_deref().unwrap_or("-"),
                    "Acknowledged test notification"
                );
                Ok(ReconcileNotificationResult::TestNotification)
            }
            DecodedNotification::Unsupported(kind) => {
                tracing::info!(
                    message_id = cmd.message.message_id.as_deref().unwrap_or("-"),
                    kind = %kind,
                    "Acknowledged unsupported notification"
                );
                Ok(ReconcileNotificationResult::Unsupported { kind })
            }
            DecodedNotification::Renewal(event) => self.reconcile(event).await,
        }
    }

    /// Reconciles an already decoded event.
    ///
    /// Also the entry point for replaying stored notifications: a stored
    /// record whose claim lapsed is re-admitted by the guard.
    pub async fn reconcile(
        &self,
        event: RenewalEvent,
    ) -> Result<ReconcileNotificationResult, WebhookError> {
        let now = Timestamp::now();

        if let Some(notification_id) = event.event_id.as_deref() {
            let record = ProcessedNotification::claim(notification_id, &event, now);
            let lapsed_before = now.minus_secs(self.settings.claim_lease.as_secs());
            match self.notifications.admit(&record, lapsed_before).await? {
                AdmitResult::Duplicate => {
                    tracing::info!(
                        notification_id = %notification_id,
                        kind = %event.kind,
                        "Duplicate notification acknowledged"
                    );
                    return Ok(ReconcileNotificationResult::Duplicate {
                        notification_id: notification_id.to_string(),
                    });
                }
                AdmitResult::Admitted { attempt } => {
                    tracing::debug!(
                        notification_id = %notification_id,
                        attempt,
                        "Notification admitted"
                    );
                }
            }
        }

        match self.reconcile_admitted(&event, now).await {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::warn!(
                    notification_id = event.event_id.as_deref().unwrap_or("-"),
                    kind = %event.kind,
                    error_kind = err.error_code(),
                    retryable = err.is_retryable(),
                    error = %err,
                    "Reconciliation failed"
                );
                if let Some(notification_id) = event.event_id.as_deref() {
                    if let Err(release_err) = self
                        .notifications
                        .release(notification_id, &err.to_string())
                        .await
                    {
                        tracing::error!(
                            notification_id = %notification_id,
                            error = %release_err,
                            "Failed to release notification claim; it will lapse"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn reconcile_admitted(
        &self,
        event: &RenewalEvent,
        now: Timestamp,
    ) -> Result<ReconcileNotificationResult, WebhookError> {
        let snapshot = self.fetch_snapshot(event).await?;

        let subscription = self.find_subscription(event, &snapshot).await?;
        let payments = self.payment_history(event, &snapshot, subscription.as_ref()).await?;

        let result = transition(subscription.as_ref(), event, &snapshot, &payments, now);
        for warning in &result.warnings {
            tracing::warn!(
                notification_id = event.event_id.as_deref().unwrap_or("-"),
                purchase_token = %event.purchase_token,
                kind = %event.kind,
                warning = %warning,
                "State machine warning"
            );
        }

        let subscription_id = subscription.as_ref().map(|s| s.id);
        let mut recurring_status = subscription.as_ref().map(|s| s.recurring_status);
        let mut disposition = result.disposition.clone();
        // Set once the ledger has marked the notification inside its commit.
        let mut marked = false;

        if result.has_effect() {
            let patch = result.patch.clone();
            let commit = result.into_commit(subscription_id, event.event_id.clone(), now);
            let committed = tokio::time::timeout(self.settings.ledger_timeout, self.ledger.commit(&commit))
                .await
                .map_err(|_| WebhookError::LedgerTimeout)??;

            match committed {
                CommitResult::Committed => {
                    marked = commit.notification_id.is_some();
                    if let Some(status) = patch.and_then(|p| p.recurring_status) {
                        recurring_status = Some(status);
                    }
                }
                CommitResult::AlreadyApplied => disposition = Disposition::AlreadyApplied,
            }
        }

        let outcome = match &disposition {
            Disposition::Applied => NotificationOutcome::Applied,
            Disposition::NoOp(_) | Disposition::AlreadyApplied => NotificationOutcome::NoOp,
            Disposition::Anomaly(_) => NotificationOutcome::Anomaly,
        };
        let detail = match &disposition {
            Disposition::AlreadyApplied => Some("already applied"),
            other => other.reason(),
        };

        if let Some(notification_id) = event.event_id.as_deref().filter(|_| !marked) {
            self.notifications
                .mark_processed(notification_id, outcome, detail, Timestamp::now())
                .await?;
        }

        match &disposition {
            Disposition::Anomaly(reason) => tracing::warn!(
                notification_id = event.event_id.as_deref().unwrap_or("-"),
                purchase_token = %event.purchase_token,
                kind = %event.kind,
                reason = %reason,
                "Reconciliation anomaly recorded"
            ),
            _ => tracing::info!(
                notification_id = event.event_id.as_deref().unwrap_or("-"),
                kind = %event.kind,
                disposition = disposition.as_str(),
                provider_state = %snapshot.raw_status,
                "Notification reconciled"
            ),
        }

        self.audit
            .record(AuditEntry {
                notification_id: event.event_id.clone(),
                purchase_token: event.purchase_token.clone(),
                kind: event.kind,
                subscription_id,
                recurring_status,
                disposition: disposition.as_str().to_string(),
                reason: detail.map(str::to_string),
                recorded_at: Timestamp::now(),
            })
            .await;

        Ok(ReconcileNotificationResult::Reconciled {
            notification_id: event.event_id.clone(),
            subscription_id,
            recurring_status,
            disposition,
        })
    }

    async fn fetch_snapshot(
        &self,
        event: &RenewalEvent,
    ) -> Result<ProviderSubscriptionSnapshot, WebhookError> {
        let fetched = tokio::time::timeout(
            self.settings.fetch_timeout,
            self.fetcher.fetch(&event.product_id, &event.purchase_token),
        )
        .await
        .map_err(|_| FetchError::Timeout)??;
        Ok(fetched)
    }

    /// Looks the subscription up by token, then by the provider's linked
    /// token (upgrade or re-signup lineage).
    async fn find_subscription(
        &self,
        event: &RenewalEvent,
        snapshot: &ProviderSubscriptionSnapshot,
    ) -> Result<Option<Subscription>, WebhookError> {
        if let Some(found) = self
            .ledger
            .find_subscription_by_token(&event.purchase_token)
            .await?
        {
            return Ok(Some(found));
        }

        let Some(linked) = snapshot.linked_purchase_token.as_deref() else {
            return Ok(None);
        };
        let found = self.ledger.find_subscription_by_token(linked).await?;
        if found.is_some() {
            tracing::info!(
                purchase_token = %event.purchase_token,
                linked_purchase_token = %linked,
                "Matched subscription through linked purchase token"
            );
        }
        Ok(found)
    }

    async fn payment_history(
        &self,
        event: &RenewalEvent,
        snapshot: &ProviderSubscriptionSnapshot,
        subscription: Option<&Subscription>,
    ) -> Result<PaymentHistory, WebhookError> {
        let for_order = self
            .ledger
            .find_payment(&event.purchase_token, snapshot.latest_order_id.as_deref())
            .await?;

        let mut latest = self.ledger.find_latest_payment(&event.purchase_token).await?;
        if latest.is_none() {
            if let Some(subscription) = subscription {
                if subscription.purchase_token != event.purchase_token {
                    latest = self
                        .ledger
                        .find_latest_payment(&subscription.purchase_token)
                        .await?;
                }
            }
        }

        Ok(PaymentHistory { for_order, latest })
    }
}
