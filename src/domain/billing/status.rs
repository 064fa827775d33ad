//! Subscription status state machines.
//!
//! Two statuses live on a subscription: the entitlement-affecting `status`
//! and the billing-side `recurring_status`.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Entitlement-affecting subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    /// User has access.
    Active,

    /// Access has ended.
    Expired,

    /// Access revoked before the period ended.
    Cancelled,
}

impl SubscriptionStatus {
    /// Returns true if this status grants access.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

/// Billing-side lifecycle of a subscription.
///
/// `Cancelled` stops billing but does not by itself end access; the
/// entitlement status decides that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurringStatus {
    /// Renewing normally.
    Active,

    /// A renewal charge failed and the provider is retrying.
    PendingPayment,

    /// Billing paused by the user.
    Paused,

    /// Will not renew.
    Cancelled,

    /// Billing has ended.
    Inactive,
}

impl StateMachine for RecurringStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use RecurringStatus::*;
        if self == target || *target == Cancelled {
            return true;
        }
        matches!(
            (self, target),
            (Active, PendingPayment)
                | (Active, Paused)
                | (PendingPayment, Active)
                | (PendingPayment, Inactive)
                | (Paused, Active)
                // Restoration of a cancelled but unexpired subscription
                | (Cancelled, Active)
                // Lapse after cancellation
                | (Cancelled, Inactive)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use RecurringStatus::*;
        match self {
            Active => vec![Active, PendingPayment, Paused, Cancelled],
            PendingPayment => vec![PendingPayment, Active, Inactive, Cancelled],
            Paused => vec![Paused, Active, Cancelled],
            Cancelled => vec![Cancelled, Active, Inactive],
            Inactive => vec![Inactive, Cancelled],
        }
    }
}
