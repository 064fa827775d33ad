//! SubscriptionLedger port - Transactional access to subscriptions and payments.
//!
//! Reads feed the state machine; `commit` is the ledger writer. A commit
//! applies the subscription patch, the ledger effect and the processed mark of
//! the claimed notification in one transaction, holding a row lock on the
//! subscription.

use async_trait::async_trait;

use crate::domain::billing::{LedgerCommit, Payment, Subscription};
use crate::domain::foundation::DomainError;

/// Result of a ledger commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    /// Patch and effect were written and the notification, if any, marked
    /// processed.
    Committed,

    /// The payment already existed (or was already refunded); nothing written.
    AlreadyApplied,
}

#[async_trait]
pub trait SubscriptionLedger: Send + Sync {
    /// Finds the subscription created from `purchase_token`.
    async fn find_subscription_by_token(
        &self,
        purchase_token: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Finds the payment for a provider transaction and order.
    async fn find_payment(
        &self,
        store_transaction_id: &str,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Payment>, DomainError>;

    /// Most recent payment for a provider transaction.
    async fn find_latest_payment(
        &self,
        store_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Applies a commit atomically.
    ///
    /// Re-checks payment uniqueness inside the transaction; a conflict rolls
    /// the whole commit back and returns `AlreadyApplied`. When
    /// `notification_id` is set, its row is marked processed with outcome
    /// `applied` before the transaction commits; failing to mark it rolls
    /// everything back.
    async fn commit(&self, commit: &LedgerCommit) -> Result<CommitResult, DomainError>;
}
