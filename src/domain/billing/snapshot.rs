//! Authoritative subscription state as reported by the provider.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// Provider-side lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderSubscriptionState {
    Pending,
    Active,
    Paused,
    InGracePeriod,
    OnHold,
    Canceled,
    Expired,
    PendingPurchaseCanceled,
    Unknown,
}

/// Ground truth fetched from the provider for one purchase token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSubscriptionSnapshot {
    pub expiry_time: Timestamp,
    pub auto_renewing: bool,
    pub latest_order_id: Option<String>,
    pub state: ProviderSubscriptionState,

    /// Provider's own status string, kept for audit.
    pub raw_status: String,

    /// Token of the subscription this one replaced, if any.
    pub linked_purchase_token: Option<String>,
}

impl ProviderSubscriptionSnapshot {
    /// True if the provider still considers the user entitled at `now`.
    pub fn is_entitled_at(&self, now: Timestamp) -> bool {
        matches!(
            self.state,
            ProviderSubscriptionState::Active
                | ProviderSubscriptionState::InGracePeriod
                | ProviderSubscriptionState::Canceled
        ) && self.expiry_time.is_after(&now)
    }

    /// True if the provider reports a live, renewing subscription at `now`.
    pub fn is_active_and_renewing_at(&self, now: Timestamp) -> bool {
        self.state == ProviderSubscriptionState::Active
            && self.auto_renewing
            && self.expiry_time.is_after(&now)
    }
}
