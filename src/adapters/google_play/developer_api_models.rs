//! Response models for `purchases.subscriptionsv2.get`.
//!
//! https://developers.google.com/android-publisher/api-ref/rest/v3/purchases.subscriptionsv2#SubscriptionPurchaseV2

use serde::Deserialize;

use crate::domain::billing::{FetchError, ProviderSubscriptionSnapshot, ProviderSubscriptionState};
use crate::domain::foundation::Timestamp;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionPurchaseV2 {
    /// Items in the same purchase are all auto-renewing or all prepaid.
    #[serde(default)]
    pub(crate) line_items: Vec<SubscriptionPurchaseLineItem>,
    pub(crate) subscription_state: SubscriptionState,
    pub(crate) latest_order_id: Option<String>,

    /// Token of the subscription this one replaced (upgrade, re-signup).
    pub(crate) linked_purchase_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum SubscriptionState {
    SubscriptionStateUnspecified,
    SubscriptionStatePending,
    SubscriptionStateActive,
    SubscriptionStatePaused,
    SubscriptionStateInGracePeriod,
    SubscriptionStateOnHold,
    SubscriptionStateCanceled,
    SubscriptionStateExpired,
    SubscriptionStatePendingPurchaseCanceled,
    #[serde(untagged)]
    Unknown(String),
}

impl SubscriptionState {
    fn raw(&self) -> String {
        match self {
            SubscriptionState::SubscriptionStateUnspecified => "SUBSCRIPTION_STATE_UNSPECIFIED",
            SubscriptionState::SubscriptionStatePending => "SUBSCRIPTION_STATE_PENDING",
            SubscriptionState::SubscriptionStateActive => "SUBSCRIPTION_STATE_ACTIVE",
            SubscriptionState::SubscriptionStatePaused => "SUBSCRIPTION_STATE_PAUSED",
            SubscriptionState::SubscriptionStateInGracePeriod => {
                "SUBSCRIPTION_STATE_IN_GRACE_PERIOD"
            }
            SubscriptionState::SubscriptionStateOnHold => "SUBSCRIPTION_STATE_ON_HOLD",
            SubscriptionState::SubscriptionStateCanceled => "SUBSCRIPTION_STATE_CANCELED",
            SubscriptionState::SubscriptionStateExpired => "SUBSCRIPTION_STATE_EXPIRED",
            SubscriptionState::SubscriptionStatePendingPurchaseCanceled => {
                "SUBSCRIPTION_STATE_PENDING_PURCHASE_CANCELED"
            }
            SubscriptionState::Unknown(other) => other.as_str(),
        }
        .to_string()
    }
}

impl From<&SubscriptionState> for ProviderSubscriptionState {
    fn from(value: &SubscriptionState) -> Self {
        match value {
            SubscriptionState::SubscriptionStatePending => ProviderSubscriptionState::Pending,
            SubscriptionState::SubscriptionStateActive => ProviderSubscriptionState::Active,
            SubscriptionState::SubscriptionStatePaused => ProviderSubscriptionState::Paused,
            SubscriptionState::SubscriptionStateInGracePeriod => {
                ProviderSubscriptionState::InGracePeriod
            }
            SubscriptionState::SubscriptionStateOnHold => ProviderSubscriptionState::OnHold,
            SubscriptionState::SubscriptionStateCanceled => ProviderSubscriptionState::Canceled,
            SubscriptionState::SubscriptionStateExpired => ProviderSubscriptionState::Expired,
            SubscriptionState::SubscriptionStatePendingPurchaseCanceled => {
                ProviderSubscriptionState::PendingPurchaseCanceled
            }
            SubscriptionState::SubscriptionStateUnspecified | SubscriptionState::Unknown(_) => {
                ProviderSubscriptionState::Unknown
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionPurchaseLineItem {
    #[serde(default)]
    pub(crate) product_id: Option<String>,

    /// RFC 3339 "Zulu" timestamp.
    pub(crate) expiry_time: Option<String>,
    pub(crate) auto_renewing_plan: Option<AutoRenewingPlan>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutoRenewingPlan {
    #[serde(default)]
    pub(crate) auto_renew_enabled: bool,
}

impl SubscriptionPurchaseV2 {
    /// Converts the response into a snapshot.
    ///
    /// Expiry is the latest `expiryTime` across line items; auto-renewal is
    /// on if any auto-renewing item has it enabled.
    pub(crate) fn into_snapshot(self) -> Result<ProviderSubscriptionSnapshot, FetchError> {
        let mut expiry: Option<Timestamp> = None;
        for item in &self.line_items {
            if let Some(raw) = item.expiry_time.as_deref() {
                let at = Timestamp::parse_rfc3339("expiryTime", raw)
                    .map_err(|e| FetchError::Malformed(e.to_string()))?;
                expiry = Some(expiry.map_or(at, |current| current.max(at)));
            }
        }
        let expiry_time =
            expiry.ok_or_else(|| FetchError::Malformed("no line item carries expiryTime".into()))?;

        let auto_renewing = self.line_items.iter().any(|item| {
            item.auto_renewing_plan
                .as_ref()
                .is_some_and(|plan| plan.auto_renew_enabled)
        });

        Ok(ProviderSubscriptionSnapshot {
            expiry_time,
            auto_renewing,
            latest_order_id: self.latest_order_id.filter(|id| !id.is_empty()),
            state: ProviderSubscriptionState::from(&self.subscription_state),
            raw_status: self.subscription_state.raw(),
            linked_purchase_token: self.linked_purchase_token.filter(|t| !t.is_empty()),
        })
    }
}
