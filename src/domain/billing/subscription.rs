//! Subscription entity and the patch type that mutates it.
//!
//! # Design Decisions
//!
//! - **Never hard-deleted**: an ended subscription stays as EXPIRED/INACTIVE
//! - **Patch-only mutation**: reconciliation never writes a whole row, it
//!   computes a `SubscriptionPatch` and the ledger writer applies it to the
//!   locked row

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PlanId, SubscriptionId, Timestamp, UserId};

use super::{RecurringStatus, SubscriptionStatus};

/// Local, authoritative view of a user's recurring subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub plan_id: PlanId,

    /// Provider purchase token the subscription was created from.
    pub purchase_token: String,

    pub status: SubscriptionStatus,
    pub recurring_status: RecurringStatus,

    /// End of the current entitlement period.
    pub end_date: Timestamp,
    pub auto_renew: bool,
    pub grace_period_end: Option<Timestamp>,
    pub next_billing_date: Option<Timestamp>,

    /// Consecutive failed renewal attempts; reset on any successful renewal.
    pub failed_attempts: u32,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an active, auto-renewing subscription for a fresh purchase.
    pub fn activate(
        user_id: UserId,
        plan_id: PlanId,
        purchase_token: impl Into<String>,
        end_date: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            user_id,
            plan_id,
            purchase_token: purchase_token.into(),
            status: SubscriptionStatus::Active,
            recurring_status: RecurringStatus::Active,
            end_date,
            auto_renew: true,
            grace_period_end: None,
            next_billing_date: Some(end_date),
            failed_attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// How a patch changes the failed-attempts counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptsChange {
    Reset,
    Increment,
}

/// Partial update to a subscription. `None` leaves a field untouched.
///
/// Nullable columns use `Option<Option<_>>` so a patch can distinguish
/// "leave alone" from "set to null".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub recurring_status: Option<RecurringStatus>,
    pub end_date: Option<Timestamp>,
    pub auto_renew: Option<bool>,
    pub grace_period_end: Option<Option<Timestamp>>,
    pub next_billing_date: Option<Option<Timestamp>>,
    pub failed_attempts: Option<AttemptsChange>,
}

impl SubscriptionPatch {
    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the patch in place and stamps `updated_at`.
    pub fn apply_to(&self, subscription: &mut Subscription, now: Timestamp) {
        if let Some(status) = self.status {
            subscription.status = status;
        }
        if let Some(recurring) = self.recurring_status {
            subscription.recurring_status = recurring;
        }
        if let Some(end_date) = self.end_date {
            subscription.end_date = end_date;
        }
        if let Some(auto_renew) = self.auto_renew {
            subscription.auto_renew = auto_renew;
        }
        if let Some(grace) = self.grace_period_end {
            subscription.grace_period_end = grace;
        }
        if let Some(next) = self.next_billing_date {
            subscription.next_billing_date = next;
        }
        match self.failed_attempts {
            Some(AttemptsChange::Reset) => subscription.failed_attempts = 0,
            Some(AttemptsChange::Increment) => {
                subscription.failed_attempts = subscription.failed_attempts.saturating_add(1)
            }
            None => {}
        }
        subscription.updated_at = now;
    }
}
