//! Payment ledger rows.
//!
//! The ledger is append-mostly: rows are inserted for charges and only ever
//! updated to record a refund. Money is stored as integer minor units.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentId, PlanId, SubscriptionId, Timestamp, UserId};

/// Lifecycle of a payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Refunded,
}

/// What a payment was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    InitialSubscription,
    Recurring,
    OneTime,
}

/// A persisted payment.
///
/// # Invariants
///
/// - At most one row per `(store_transaction_id, provider_order_id)`
/// - `refunded_at` is set iff `status == Refunded`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub subscription_id: Option<SubscriptionId>,

    /// Provider purchase token.
    pub store_transaction_id: String,
    pub provider_order_id: Option<String>,

    pub status: PaymentStatus,
    pub amount_cents: i64,
    pub payment_type: PaymentType,

    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub refunded_at: Option<Timestamp>,
}

impl Payment {
    /// True if this row belongs to the given provider transaction.
    pub fn matches(&self, store_transaction_id: &str, provider_order_id: Option<&str>) -> bool {
        self.store_transaction_id == store_transaction_id
            && self.provider_order_id.as_deref() == provider_order_id
    }

    /// Marks the payment refunded.
    pub fn refund(&mut self, refunded_at: Timestamp) {
        self.status = PaymentStatus::Refunded;
        self.refunded_at = Some(refunded_at);
    }
}

/// A payment the ledger writer should insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub user_id: UserId,
    pub plan_id: PlanId,
    pub subscription_id: Option<SubscriptionId>,
    pub store_transaction_id: String,
    pub provider_order_id: Option<String>,
    pub amount_cents: i64,
    pub payment_type: PaymentType,
    pub paid_at: Timestamp,
}

impl NewPayment {
    /// Materialises the row as a settled payment.
    pub fn into_payment(self, created_at: Timestamp) -> Payment {
        Payment {
            id: PaymentId::new(),
            user_id: self.user_id,
            plan_id: self.plan_id,
            subscription_id: self.subscription_id,
            store_transaction_id: self.store_transaction_id,
            provider_order_id: self.provider_order_id,
            status: PaymentStatus::Paid,
            amount_cents: self.amount_cents,
            payment_type: self.payment_type,
            created_at,
            paid_at: Some(self.paid_at),
            refunded_at: None,
        }
    }
}
