//! Provider-neutral renewal notifications.
//!
//! Decoders translate provider wire formats into a `RenewalEvent`; nothing
//! downstream of the decoder knows which provider sent it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Closed set of lifecycle events a provider can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenewalEventKind {
    Purchased,
    Renewed,
    Recovered,
    Cancelled,
    OnHold,
    InGracePeriod,
    Restarted,
    Paused,
    PriceChangeConfirmed,
    Deferred,
    PauseScheduleChanged,
    Revoked,
    Expired,
    PendingPurchaseCanceled,
}

impl RenewalEventKind {
    /// Stable name used for persistence and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RenewalEventKind::Purchased => "PURCHASED",
            RenewalEventKind::Renewed => "RENEWED",
            RenewalEventKind::Recovered => "RECOVERED",
            RenewalEventKind::Cancelled => "CANCELLED",
            RenewalEventKind::OnHold => "ON_HOLD",
            RenewalEventKind::InGracePeriod => "IN_GRACE_PERIOD",
            RenewalEventKind::Restarted => "RESTARTED",
            RenewalEventKind::Paused => "PAUSED",
            RenewalEventKind::PriceChangeConfirmed => "PRICE_CHANGE_CONFIRMED",
            RenewalEventKind::Deferred => "DEFERRED",
            RenewalEventKind::PauseScheduleChanged => "PAUSE_SCHEDULE_CHANGED",
            RenewalEventKind::Revoked => "REVOKED",
            RenewalEventKind::Expired => "EXPIRED",
            RenewalEventKind::PendingPurchaseCanceled => "PENDING_PURCHASE_CANCELED",
        }
    }

    /// True for kinds that presuppose an existing local subscription.
    ///
    /// Revocation is keyed on the payment instead.
    pub fn requires_subscription(&self) -> bool {
        !matches!(
            self,
            RenewalEventKind::Purchased
                | RenewalEventKind::PendingPurchaseCanceled
                | RenewalEventKind::Revoked
        )
    }
}

impl fmt::Display for RenewalEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized renewal notification.
///
/// # Invariants
///
/// - `event_id`, when present, is unique per provider
/// - `purchase_token` and `product_id` are non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalEvent {
    /// Provider-assigned delivery id, used as the dedup key.
    pub event_id: Option<String>,
    pub kind: RenewalEventKind,
    pub purchase_token: String,
    pub product_id: String,
    pub event_time: Option<Timestamp>,
}

impl RenewalEvent {
    /// Builds an event, rejecting empty identifiers.
    pub fn new(
        event_id: Option<String>,
        kind: RenewalEventKind,
        purchase_token: impl Into<String>,
        product_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let purchase_token = purchase_token.into();
        let product_id = product_id.into();
        if purchase_token.trim().is_empty() {
            return Err(ValidationError::empty_field("purchase_token"));
        }
        if product_id.trim().is_empty() {
            return Err(ValidationError::empty_field("product_id"));
        }
        Ok(Self {
            event_id: event_id.filter(|id| !id.trim().is_empty()),
            kind,
            purchase_token,
            product_id,
            event_time: None,
        })
    }

    pub fn with_event_time(mut self, event_time: Timestamp) -> Self {
        self.event_time = Some(event_time);
        self
    }
}
