//! End-to-end reconciliation scenarios over the in-memory adapters.
//!
//! Each test pushes encoded notifications through the handler exactly as the
//! webhook would and asserts on the resulting ledger state.

use std::sync::Arc;
use std::time::Duration;

use base64::{prelude::BASE64_STANDARD, Engine as _};
use serde_json::json;

use renewal_reconciler::adapters::audit::InMemoryAuditSink;
use renewal_reconciler::adapters::google_play::GooglePlayNotificationDecoder;
use renewal_reconciler::adapters::memory::{
    InMemoryProcessedNotificationStore, InMemorySubscriptionLedger,
    InMemorySubscriptionStateFetcher, LedgerFault,
};
use renewal_reconciler::application::{
    NotificationSweeper, NotificationSweeperConfig, ReconcileNotificationCommand,
    ReconcileNotificationHandler, ReconcileNotificationResult, ReconcileSettings,
};
use renewal_reconciler::domain::billing::{
    Disposition, FetchError, NewPayment, PaymentStatus, PaymentType, ProviderSubscriptionSnapshot,
    ProviderSubscriptionState, RecurringStatus, Subscription, SubscriptionStatus, WebhookError,
};
use renewal_reconciler::domain::foundation::{PlanId, Timestamp, UserId};
use renewal_reconciler::ports::{InboundMessage, NotificationOutcome, ProcessedNotificationStore};

const PACKAGE: &str = "com.example.app";
const TOKEN: &str = "purchase-token-1";

// Google Play notification type codes.
const RECOVERED: u8 = 1;
const RENEWED: u8 = 2;
const CANCELED: u8 = 3;
const ON_HOLD: u8 = 5;
const IN_GRACE_PERIOD: u8 = 6;
const REVOKED: u8 = 12;
const EXPIRED: u8 = 13;

// =============================================================================
// Test Infrastructure
// =============================================================================

struct World {
    handler: Arc<ReconcileNotificationHandler>,
    fetcher: Arc<InMemorySubscriptionStateFetcher>,
    notifications: Arc<InMemoryProcessedNotificationStore>,
    ledger: Arc<InMemorySubscriptionLedger>,
    audit: Arc<InMemoryAuditSink>,
}

impl World {
    fn new() -> Self {
        let fetcher = Arc::new(InMemorySubscriptionStateFetcher::new());
        let notifications = Arc::new(InMemoryProcessedNotificationStore::new());
        let ledger = Arc::new(InMemorySubscriptionLedger::new(notifications.clone()));
        let audit = Arc::new(InMemoryAuditSink::new());
        let handler = ReconcileNotificationHandler::new(
            Arc::new(GooglePlayNotificationDecoder::new(PACKAGE)),
            fetcher.clone(),
            notifications.clone(),
            ledger.clone(),
            audit.clone(),
        )
        .with_settings(ReconcileSettings {
            fetch_timeout: Duration::from_millis(200),
            ledger_timeout: Duration::from_millis(200),
            claim_lease: Duration::from_secs(300),
        });

        Self {
            handler: Arc::new(handler),
            fetcher,
            notifications,
            ledger,
            audit,
        }
    }

    /// Seeds an active subscription paid with order `GPA.0`.
    async fn seed(&self, amount_cents: i64) -> Subscription {
        let sub = Subscription::activate(
            UserId::new(),
            PlanId::new(),
            TOKEN,
            Timestamp::now().add_days(2),
        );
        self.ledger.insert_subscription(sub.clone()).await;
        self.ledger
            .insert_payment(
                NewPayment {
                    user_id: sub.user_id,
                    plan_id: sub.plan_id,
                    subscription_id: Some(sub.id),
                    store_transaction_id: TOKEN.to_string(),
                    provider_order_id: Some("GPA.0".to_string()),
                    amount_cents,
                    payment_type: PaymentType::InitialSubscription,
                    paid_at: Timestamp::now().minus_days(28),
                }
                .into_payment(Timestamp::now().minus_days(28)),
            )
            .await;
        sub
    }

    async fn provider_reports(&self, snapshot: ProviderSubscriptionSnapshot) {
        self.fetcher.set_snapshot(TOKEN, snapshot).await;
    }

    async fn push(
        &self,
        message_id: &str,
        code: u8,
    ) -> Result<ReconcileNotificationResult, WebhookError> {
        self.handler
            .handle(ReconcileNotificationCommand {
                message: message(message_id, code),
            })
            .await
    }

    async fn subscription(&self, sub: &Subscription) -> Subscription {
        self.ledger.subscription(sub.id).await.unwrap()
    }
}

fn message(message_id: &str, code: u8) -> InboundMessage {
    let payload = json!({
        "version": "1.0",
        "packageName": PACKAGE,
        "eventTimeMillis": "1717243200000",
        "subscriptionNotification": {
            "version": "1.0",
            "notificationType": code,
            "purchaseToken": TOKEN,
            "subscriptionId": "monthly"
        }
    });
    InboundMessage {
        message_id: Some(message_id.to_string()),
        data: BASE64_STANDARD.encode(payload.to_string()),
        ..Default::default()
    }
}

fn snapshot(
    state: ProviderSubscriptionState,
    expiry_days: i64,
    renewing: bool,
    order: &str,
) -> ProviderSubscriptionSnapshot {
    ProviderSubscriptionSnapshot {
        expiry_time: Timestamp::now().add_days(expiry_days),
        auto_renewing: renewing,
        latest_order_id: Some(order.to_string()),
        state,
        raw_status: format!("{:?}", state),
        linked_purchase_token: None,
    }
}

fn disposition(result: &ReconcileNotificationResult) -> Option<&Disposition> {
    match result {
        ReconcileNotificationResult::Reconciled { disposition, .. } => Some(disposition),
        _ => None,
    }
}

// =============================================================================
// Idempotency
// =============================================================================

#[tokio::test]
async fn redelivered_renewal_records_one_payment() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    let first = world.push("n-1", RENEWED).await.unwrap();
    let after_first = world.subscription(&sub).await;
    let second = world.push("n-1", RENEWED).await.unwrap();

    assert_eq!(disposition(&first), Some(&Disposition::Applied));
    assert!(matches!(second, ReconcileNotificationResult::Duplicate { .. }));
    assert_eq!(world.ledger.payments().await.len(), 2);
    assert_eq!(world.subscription(&sub).await, after_first);
    assert_eq!(world.fetcher.calls().await.len(), 1);
}

#[tokio::test]
async fn distinct_deliveries_of_same_order_record_one_payment() {
    let world = World::new();
    world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    world.push("n-1", RENEWED).await.unwrap();
    let second = world.push("n-2", RENEWED).await.unwrap();

    assert_eq!(disposition(&second), Some(&Disposition::AlreadyApplied));
    let renewals: Vec<_> = world
        .ledger
        .payments()
        .await
        .into_iter()
        .filter(|p| p.provider_order_id.as_deref() == Some("GPA.0..1"))
        .collect();
    assert_eq!(renewals.len(), 1);
}

#[tokio::test]
async fn concurrent_deliveries_apply_once() {
    let world = World::new();
    world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let handler = world.handler.clone();
        handles.push(tokio::spawn(async move {
            handler
                .handle(ReconcileNotificationCommand {
                    message: message("n-1", RENEWED),
                })
                .await
                .unwrap()
        }));
    }

    let mut applied = 0;
    for handle in handles {
        if disposition(&handle.await.unwrap()) == Some(&Disposition::Applied) {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(world.ledger.payments().await.len(), 2);
}

// =============================================================================
// Atomicity and Retry
// =============================================================================

#[tokio::test]
async fn crash_mid_commit_leaves_no_partial_state_and_retry_succeeds() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;
    world.ledger.inject_fault(LedgerFault::CrashAfterPatch).await;

    let err = world.push("n-1", RENEWED).await.unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(world.subscription(&sub).await, sub);
    assert_eq!(world.ledger.payments().await.len(), 1);
    let record = world.notifications.find("n-1").await.unwrap().unwrap();
    assert!(!record.processed);

    let retry = world.push("n-1", RENEWED).await.unwrap();

    assert_eq!(disposition(&retry), Some(&Disposition::Applied));
    assert_eq!(world.ledger.payments().await.len(), 2);
}

#[tokio::test]
async fn fetch_failure_is_retried_by_sweeper() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;
    world.fetcher.fail_next(FetchError::Timeout).await;

    let err = world.push("n-1", RENEWED).await.unwrap_err();
    assert!(matches!(err, WebhookError::Fetch(FetchError::Timeout)));
    assert_eq!(world.subscription(&sub).await, sub);

    let sweeper = NotificationSweeper::new(
        world.notifications.clone(),
        world.handler.clone(),
        NotificationSweeperConfig::default().with_claim_lease(Duration::ZERO),
    );
    let report = sweeper.poll_once().await.unwrap();

    assert_eq!(report.reconciled, 1);
    let record = world.notifications.find("n-1").await.unwrap().unwrap();
    assert!(record.processed);
    assert_eq!(record.outcome, Some(NotificationOutcome::Applied));
    assert_eq!(world.ledger.payments().await.len(), 2);
}

#[tokio::test]
async fn slow_provider_times_out_as_retryable() {
    let world = World::new();
    world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;
    world.fetcher.set_delay(Some(Duration::from_secs(2))).await;

    let err = world.push("n-1", RENEWED).await.unwrap_err();

    assert!(matches!(err, WebhookError::Fetch(FetchError::Timeout)));
    assert!(!world.notifications.find("n-1").await.unwrap().unwrap().processed);
}

// =============================================================================
// Lifecycle Scenarios
// =============================================================================

#[tokio::test]
async fn renewal_extends_entitlement_and_prices_from_last_payment() {
    let world = World::new();
    let sub = world.seed(999).await;
    let provider = snapshot(ProviderSubscriptionState::Active, 32, true, "GPA.0..1");
    world.provider_reports(provider.clone()).await;

    world.push("n-1", RENEWED).await.unwrap();

    let stored = world.subscription(&sub).await;
    assert_eq!(stored.end_date, provider.expiry_time);
    assert_eq!(stored.next_billing_date, Some(provider.expiry_time));
    assert_eq!(stored.failed_attempts, 0);
    let renewal = world
        .ledger
        .payments()
        .await
        .into_iter()
        .find(|p| p.payment_type == PaymentType::Recurring)
        .unwrap();
    assert_eq!(renewal.amount_cents, 999);
    assert_eq!(renewal.status, PaymentStatus::Paid);
}

#[tokio::test]
async fn grace_period_keeps_access() {
    let world = World::new();
    let sub = world.seed(499).await;
    let provider = snapshot(ProviderSubscriptionState::InGracePeriod, 3, true, "GPA.0");
    world.provider_reports(provider.clone()).await;

    world.push("n-1", IN_GRACE_PERIOD).await.unwrap();

    let stored = world.subscription(&sub).await;
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(stored.recurring_status, RecurringStatus::PendingPayment);
    assert_eq!(stored.grace_period_end, Some(provider.expiry_time));
    assert_eq!(stored.end_date, sub.end_date);
}

#[tokio::test]
async fn cancellation_keeps_access_until_end_date() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Canceled, 2, false, "GPA.0"))
        .await;

    world.push("n-1", CANCELED).await.unwrap();

    let stored = world.subscription(&sub).await;
    assert_eq!(stored.status, SubscriptionStatus::Active);
    assert_eq!(stored.recurring_status, RecurringStatus::Cancelled);
    assert!(!stored.auto_renew);
    assert_eq!(stored.end_date, sub.end_date);
}

#[tokio::test]
async fn revocation_refunds_and_cancels_together() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Expired, -1, false, "GPA.0"))
        .await;

    let result = world.push("n-1", REVOKED).await.unwrap();

    assert_eq!(disposition(&result), Some(&Disposition::Applied));
    let payments = world.ledger.payments().await;
    assert_eq!(payments[0].status, PaymentStatus::Refunded);
    assert!(payments[0].refunded_at.is_some());
    let stored = world.subscription(&sub).await;
    assert_eq!(stored.status, SubscriptionStatus::Cancelled);
    assert_eq!(stored.recurring_status, RecurringStatus::Cancelled);

    let replay = world.push("n-2", REVOKED).await.unwrap();
    assert_eq!(disposition(&replay), Some(&Disposition::AlreadyApplied));
}

#[tokio::test]
async fn stale_renewal_after_revocation_keeps_subscription_cancelled() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;
    world.push("n-1", RENEWED).await.unwrap();

    world
        .provider_reports(snapshot(ProviderSubscriptionState::Expired, -1, false, "GPA.0..1"))
        .await;
    world.push("n-2", REVOKED).await.unwrap();
    let revoked = world.subscription(&sub).await;

    // Late redelivery of the same order under a fresh message id.
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;
    let late = world.push("n-3", RENEWED).await.unwrap();

    assert_eq!(disposition(&late), Some(&Disposition::AlreadyApplied));
    let stored = world.subscription(&sub).await;
    assert_eq!(stored, revoked);
    assert_eq!(stored.status, SubscriptionStatus::Cancelled);
    assert_eq!(stored.recurring_status, RecurringStatus::Cancelled);
    assert!(!stored.auto_renew);
    let payments = world.ledger.payments().await;
    assert_eq!(payments.len(), 2);
    assert_eq!(payments[1].provider_order_id.as_deref(), Some("GPA.0..1"));
    assert_eq!(payments[1].status, PaymentStatus::Refunded);
    let record = world.notifications.find("n-3").await.unwrap().unwrap();
    assert_eq!(record.outcome, Some(NotificationOutcome::NoOp));
}

#[tokio::test]
async fn stale_cancellation_after_renewal_is_ignored() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    world.push("n-renew", RENEWED).await.unwrap();
    let renewed = world.subscription(&sub).await;
    let late = world.push("n-cancel", CANCELED).await.unwrap();

    assert!(matches!(disposition(&late), Some(Disposition::NoOp(_))));
    assert_eq!(world.subscription(&sub).await, renewed);
    assert!(renewed.auto_renew);
}

#[tokio::test]
async fn stale_expiry_is_ignored_while_provider_entitles() {
    let world = World::new();
    let sub = world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    let result = world.push("n-1", EXPIRED).await.unwrap();

    assert!(matches!(disposition(&result), Some(Disposition::NoOp(_))));
    assert_eq!(world.subscription(&sub).await.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn hold_then_grace_then_recovery_and_late_replay() {
    let world = World::new();
    let sub = world.seed(499).await;

    world
        .provider_reports(snapshot(ProviderSubscriptionState::OnHold, -1, true, "GPA.0"))
        .await;
    world.push("n1", ON_HOLD).await.unwrap();
    let held = world.subscription(&sub).await;
    assert_eq!(held.recurring_status, RecurringStatus::PendingPayment);
    assert_eq!(held.failed_attempts, 1);

    let grace = snapshot(ProviderSubscriptionState::InGracePeriod, 3, true, "GPA.0");
    world.provider_reports(grace.clone()).await;
    world.push("n2", IN_GRACE_PERIOD).await.unwrap();
    assert_eq!(
        world.subscription(&sub).await.grace_period_end,
        Some(grace.expiry_time)
    );

    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0"))
        .await;
    world.push("n3", RECOVERED).await.unwrap();
    let recovered = world.subscription(&sub).await;
    assert_eq!(recovered.recurring_status, RecurringStatus::Active);
    assert_eq!(recovered.failed_attempts, 0);
    assert_eq!(recovered.grace_period_end, None);

    let replay = world.push("n1", ON_HOLD).await.unwrap();
    assert!(matches!(replay, ReconcileNotificationResult::Duplicate { .. }));
    assert_eq!(world.subscription(&sub).await, recovered);
}

// =============================================================================
// Anomalies and Audit
// =============================================================================

#[tokio::test]
async fn unknown_token_is_recorded_as_anomaly() {
    let world = World::new();
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.9"))
        .await;

    let result = world.push("n-1", RENEWED).await.unwrap();

    assert!(matches!(disposition(&result), Some(Disposition::Anomaly(_))));
    let anomalies = world.notifications.list_anomalies(10).await.unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].notification_id, "n-1");
    assert!(world.ledger.payments().await.is_empty());
}

#[tokio::test]
async fn every_reconciled_notification_is_audited() {
    let world = World::new();
    world.seed(499).await;
    world
        .provider_reports(snapshot(ProviderSubscriptionState::Active, 30, true, "GPA.0..1"))
        .await;

    world.push("n-1", RENEWED).await.unwrap();
    world.push("n-1", RENEWED).await.unwrap();

    let entries = world.audit.entries().await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].notification_id.as_deref(), Some("n-1"));
    assert_eq!(entries[0].disposition, "applied");
    assert_eq!(entries[0].recurring_status, Some(RecurringStatus::Active));
}
