//! In-memory SubscriptionLedger for tests and local runs.
//!
//! `commit` holds the write lock for the whole unit of work and mutates a
//! working copy that replaces the live state only on success, so a failure
//! at any point leaves nothing behind. The claimed notification is marked
//! processed through the shared notification store as the last step before
//! the swap. A one-shot fault can be injected between the subscription patch
//! and the ledger effect to simulate a crash mid-transaction.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

use crate::domain::billing::{LedgerCommit, LedgerEffect, Payment, PaymentStatus, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId};
use crate::ports::{
    CommitResult, NotificationOutcome, ProcessedNotificationStore, SubscriptionLedger,
};

/// Failure to inject into the next commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerFault {
    /// Fail after the patch is applied but before the ledger effect.
    CrashAfterPatch,

    /// Fail before touching anything.
    Unavailable,

    /// Sleep before committing.
    Stall(Duration),
}

#[derive(Debug, Clone, Default)]
struct LedgerState {
    subscriptions: HashMap<SubscriptionId, Subscription>,
    payments: Vec<Payment>,
}

pub struct InMemorySubscriptionLedger {
    state: RwLock<LedgerState>,
    fault: Mutex<Option<LedgerFault>>,
    notifications: Arc<dyn ProcessedNotificationStore>,
}

impl InMemorySubscriptionLedger {
    /// Creates a ledger that marks committed notifications in `notifications`.
    pub fn new(notifications: Arc<dyn ProcessedNotificationStore>) -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            fault: Mutex::new(None),
            notifications,
        }
    }

    // === Test Helpers ===

    pub async fn insert_subscription(&self, subscription: Subscription) {
        self.state
            .write()
            .await
            .subscriptions
            .insert(subscription.id, subscription);
    }

    pub async fn insert_payment(&self, payment: Payment) {
        self.state.write().await.payments.push(payment);
    }

    pub async fn subscription(&self, id: SubscriptionId) -> Option<Subscription> {
        self.state.read().await.subscriptions.get(&id).cloned()
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.clone()
    }

    /// Arms a fault for the next commit only.
    pub async fn inject_fault(&self, fault: LedgerFault) {
        *self.fault.lock().await = Some(fault);
    }
}

fn injected(message: &str) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("injected fault: {}", message))
}

#[async_trait]
impl SubscriptionLedger for InMemorySubscriptionLedger {
    async fn find_subscription_by_token(
        &self,
        purchase_token: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .subscriptions
            .values()
            .find(|s| s.purchase_token == purchase_token)
            .cloned())
    }

    async fn find_payment(
        &self,
        store_transaction_id: &str,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Payment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .find(|p| p.matches(store_transaction_id, provider_order_id))
            .cloned())
    }

    async fn find_latest_payment(
        &self,
        store_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .payments
            .iter()
            .filter(|p| p.store_transaction_id == store_transaction_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn commit(&self, commit: &LedgerCommit) -> Result<CommitResult, DomainError> {
        let fault = self.fault.lock().await.take();
        if let Some(LedgerFault::Stall(duration)) = fault {
            tokio::time::sleep(duration).await;
        }
        if fault == Some(LedgerFault::Unavailable) {
            return Err(injected("ledger unavailable"));
        }

        let mut state = self.state.write().await;
        let mut working = state.clone();

        if let Some(patch) = &commit.patch {
            let id = commit.subscription_id.ok_or_else(|| {
                DomainError::new(ErrorCode::InternalError, "patch without subscription id")
            })?;
            let subscription = working.subscriptions.get_mut(&id).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", id),
                )
            })?;
            patch.apply_to(subscription, commit.now);
        }

        if fault == Some(LedgerFault::CrashAfterPatch) {
            return Err(injected("crash after subscription patch"));
        }

        match &commit.effect {
            LedgerEffect::None => {}
            LedgerEffect::InsertPayment(new_payment) => {
                let exists = working.payments.iter().any(|p| {
                    p.matches(
                        &new_payment.store_transaction_id,
                        new_payment.provider_order_id.as_deref(),
                    )
                });
                if exists {
                    return Ok(CommitResult::AlreadyApplied);
                }
                working
                    .payments
                    .push(new_payment.clone().into_payment(commit.now));
            }
            LedgerEffect::Refund {
                payment_id,
                refunded_at,
            } => {
                let payment = working
                    .payments
                    .iter_mut()
                    .find(|p| p.id == *payment_id)
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::PaymentNotFound,
                            format!("Payment not found: {}", payment_id),
                        )
                    })?;
                if payment.status == PaymentStatus::Refunded {
                    return Ok(CommitResult::AlreadyApplied);
                }
                payment.refund(*refunded_at);
            }
        }

        if let Some(notification_id) = commit.notification_id.as_deref() {
            self.notifications
                .mark_processed(notification_id, NotificationOutcome::Applied, None, commit.now)
                .await?;
        }

        *state = working;
        Ok(CommitResult::Committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryProcessedNotificationStore;
    use crate::domain::billing::{
        NewPayment, PaymentType, RecurringStatus, RenewalEvent, RenewalEventKind,
        SubscriptionPatch, SubscriptionStatus,
    };
    use crate::domain::foundation::{PlanId, Timestamp, UserId};
    use crate::ports::ProcessedNotification;

    fn ledger_with_store() -> (InMemorySubscriptionLedger, Arc<InMemoryProcessedNotificationStore>) {
        let store = Arc::new(InMemoryProcessedNotificationStore::new());
        (InMemorySubscriptionLedger::new(store.clone()), store)
    }

    fn ledger() -> InMemorySubscriptionLedger {
        ledger_with_store().0
    }

    fn subscription() -> Subscription {
        Subscription::activate(UserId::new(), PlanId::new(), "tok", Timestamp::now().add_days(3))
    }

    fn renewal(sub: &Subscription, order: &str) -> NewPayment {
        NewPayment {
            user_id: sub.user_id,
            plan_id: sub.plan_id,
            subscription_id: Some(sub.id),
            store_transaction_id: sub.purchase_token.clone(),
            provider_order_id: Some(order.to_string()),
            amount_cents: 499,
            payment_type: PaymentType::Recurring,
            paid_at: Timestamp::now(),
        }
    }

    fn renew_commit(sub: &Subscription, order: &str) -> LedgerCommit {
        LedgerCommit {
            subscription_id: Some(sub.id),
            notification_id: None,
            patch: Some(SubscriptionPatch {
                end_date: Some(Timestamp::now().add_days(33)),
                ..Default::default()
            }),
            effect: LedgerEffect::InsertPayment(renewal(sub, order)),
            now: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn commit_applies_patch_and_payment() {
        let ledger = ledger();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        let commit = renew_commit(&sub, "GPA.1");

        let result = ledger.commit(&commit).await.unwrap();

        assert_eq!(result, CommitResult::Committed);
        let stored = ledger.subscription(sub.id).await.unwrap();
        assert_eq!(Some(stored.end_date), commit.patch.unwrap().end_date);
        assert_eq!(ledger.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_payment_rolls_back_patch() {
        let ledger = ledger();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        ledger
            .insert_payment(renewal(&sub, "GPA.1").into_payment(Timestamp::now()))
            .await;

        let result = ledger.commit(&renew_commit(&sub, "GPA.1")).await.unwrap();

        assert_eq!(result, CommitResult::AlreadyApplied);
        assert_eq!(ledger.subscription(sub.id).await.unwrap().end_date, sub.end_date);
        assert_eq!(ledger.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn crash_after_patch_leaves_nothing_behind() {
        let ledger = ledger();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        ledger.inject_fault(LedgerFault::CrashAfterPatch).await;

        let result = ledger.commit(&renew_commit(&sub, "GPA.1")).await;

        assert!(result.is_err());
        assert_eq!(ledger.subscription(sub.id).await.unwrap(), sub);
        assert!(ledger.payments().await.is_empty());

        // Fault is one-shot; the retry goes through.
        let retry = ledger.commit(&renew_commit(&sub, "GPA.1")).await.unwrap();
        assert_eq!(retry, CommitResult::Committed);
    }

    #[tokio::test]
    async fn refund_and_cancel_commit_together() {
        let ledger = ledger();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        let payment = renewal(&sub, "GPA.1").into_payment(Timestamp::now());
        ledger.insert_payment(payment.clone()).await;
        let now = Timestamp::now();
        let commit = LedgerCommit {
            subscription_id: Some(sub.id),
            notification_id: None,
            patch: Some(SubscriptionPatch {
                status: Some(SubscriptionStatus::Cancelled),
                recurring_status: Some(RecurringStatus::Cancelled),
                auto_renew: Some(false),
                ..Default::default()
            }),
            effect: LedgerEffect::Refund {
                payment_id: payment.id,
                refunded_at: now,
            },
            now,
        };

        assert_eq!(ledger.commit(&commit).await.unwrap(), CommitResult::Committed);
        assert_eq!(ledger.payments().await[0].status, PaymentStatus::Refunded);
        assert_eq!(
            ledger.subscription(sub.id).await.unwrap().status,
            SubscriptionStatus::Cancelled
        );

        assert_eq!(
            ledger.commit(&commit).await.unwrap(),
            CommitResult::AlreadyApplied
        );
    }

    #[tokio::test]
    async fn patch_for_unknown_subscription_fails() {
        let ledger = ledger();
        let sub = subscription();

        let err = ledger.commit(&renew_commit(&sub, "GPA.1")).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::SubscriptionNotFound);
        assert!(ledger.payments().await.is_empty());
    }

    #[tokio::test]
    async fn latest_payment_is_most_recent() {
        let ledger = ledger();
        let sub = subscription();
        let older = renewal(&sub, "GPA.1").into_payment(Timestamp::now().minus_days(30));
        let newer = renewal(&sub, "GPA.2").into_payment(Timestamp::now());
        ledger.insert_payment(newer.clone()).await;
        ledger.insert_payment(older).await;

        let latest = ledger.find_latest_payment("tok").await.unwrap().unwrap();

        assert_eq!(latest.id, newer.id);
    }

    #[tokio::test]
    async fn commit_marks_claimed_notification_processed() {
        let (ledger, store) = ledger_with_store();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        let event = RenewalEvent::new(Some("n1".into()), RenewalEventKind::Renewed, "tok", "monthly").unwrap();
        store.put(ProcessedNotification::claim("n1", &event, Timestamp::now())).await;
        let commit = LedgerCommit {
            notification_id: Some("n1".to_string()),
            ..renew_commit(&sub, "GPA.1")
        };

        assert_eq!(ledger.commit(&commit).await.unwrap(), CommitResult::Committed);

        let record = store.find("n1").await.unwrap().unwrap();
        assert!(record.processed);
        assert_eq!(record.outcome, Some(NotificationOutcome::Applied));
        assert_eq!(record.claimed_at, None);
    }

    #[tokio::test]
    async fn failed_notification_mark_rolls_back_commit() {
        let ledger = ledger();
        let sub = subscription();
        ledger.insert_subscription(sub.clone()).await;
        let commit = LedgerCommit {
            notification_id: Some("never-claimed".to_string()),
            ..renew_commit(&sub, "GPA.1")
        };

        let err = ledger.commit(&commit).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::NotificationNotFound);
        assert_eq!(ledger.subscription(sub.id).await.unwrap(), sub);
        assert!(ledger.payments().await.is_empty());
    }
}
