//! Wire models for Google Play Real-time Developer Notifications.
//!
//! https://developer.android.com/google/play/billing/rtdn-reference
//!
//! Only the fields the decoder reads are modelled; unknown fields are
//! ignored so additive provider changes don't break decoding.

use serde::Deserialize;
use serde_repr::Deserialize_repr;

use crate::domain::billing::RenewalEventKind;

/// Decoded body of a Pub/Sub message published by Google Play.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeveloperNotification {
    #[serde(default)]
    pub(crate) version: Option<String>,

    /// Package of the application the notification relates to.
    pub(crate) package_name: String,

    /// Event time in milliseconds since the Epoch. Google sends it as a
    /// JSON string.
    #[serde(default)]
    pub(crate) event_time_millis: Option<EventTimeMillis>,

    // Exactly one of the following is present.
    pub(crate) subscription_notification: Option<SubscriptionNotification>,
    pub(crate) one_time_product_notification: Option<serde_json::Value>,
    pub(crate) voided_purchase_notification: Option<serde_json::Value>,
    pub(crate) test_notification: Option<serde_json::Value>,
}

/// `eventTimeMillis` arrives as a string in production and as a number in
/// some console test payloads.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum EventTimeMillis {
    Text(String),
    Number(i64),
}

impl EventTimeMillis {
    pub(crate) fn as_millis(&self) -> Option<i64> {
        match self {
            EventTimeMillis::Text(s) => s.trim().parse().ok(),
            EventTimeMillis::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SubscriptionNotification {
    #[serde(default)]
    pub(crate) version: Option<String>,
    pub(crate) notification_type: NotificationTypeCode,
    pub(crate) purchase_token: String,

    /// The purchased subscription's product id (for example "monthly001").
    pub(crate) subscription_id: String,
}

/// `notificationType` as sent. Codes Google adds later land in `Unknown`
/// instead of failing the whole payload.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub(crate) enum NotificationTypeCode {
    Known(SubscriptionNotificationType),
    Unknown(i64),
}

#[derive(Debug, Clone, Copy, Deserialize_repr, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum SubscriptionNotificationType {
    SubscriptionRecovered = 1,
    SubscriptionRenewed = 2,
    SubscriptionCanceled = 3,
    SubscriptionPurchased = 4,
    SubscriptionOnHold = 5,
    SubscriptionInGracePeriod = 6,
    SubscriptionRestarted = 7,
    SubscriptionPriceChangeConfirmed = 8,
    SubscriptionDeferred = 9,
    SubscriptionPaused = 10,
    SubscriptionPauseScheduleChanged = 11,
    SubscriptionRevoked = 12,
    SubscriptionExpired = 13,
    SubscriptionPendingPurchaseCanceled = 20,
}

impl From<SubscriptionNotificationType> for RenewalEventKind {
    fn from(value: SubscriptionNotificationType) -> Self {
        use SubscriptionNotificationType::*;
        match value {
            SubscriptionRecovered => RenewalEventKind::Recovered,
            SubscriptionRenewed => RenewalEventKind::Renewed,
            SubscriptionCanceled => RenewalEventKind::Cancelled,
            SubscriptionPurchased => RenewalEventKind::Purchased,
            SubscriptionOnHold => RenewalEventKind::OnHold,
            SubscriptionInGracePeriod => RenewalEventKind::InGracePeriod,
            SubscriptionRestarted => RenewalEventKind::Restarted,
            SubscriptionPriceChangeConfirmed => RenewalEventKind::PriceChangeConfirmed,
            SubscriptionDeferred => RenewalEventKind::Deferred,
            SubscriptionPaused => RenewalEventKind::Paused,
            SubscriptionPauseScheduleChanged => RenewalEventKind::PauseScheduleChanged,
            SubscriptionRevoked => RenewalEventKind::Revoked,
            SubscriptionExpired => RenewalEventKind::Expired,
            SubscriptionPendingPurchaseCanceled => RenewalEventKind::PendingPurchaseCanceled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_codes_map_to_kinds() {
        let cases = [
            (1, RenewalEventKind::Recovered),
            (2, RenewalEventKind::Renewed),
            (3, RenewalEventKind::Cancelled),
            (5, RenewalEventKind::OnHold),
            (6, RenewalEventKind::InGracePeriod),
            (12, RenewalEventKind::Revoked),
            (13, RenewalEventKind::Expired),
            (20, RenewalEventKind::PendingPurchaseCanceled),
        ];
        for (code, kind) in cases {
            let parsed: SubscriptionNotificationType =
                serde_json::from_str(&code.to_string()).unwrap();
            assert_eq!(RenewalEventKind::from(parsed), kind, "code {}", code);
        }
    }

    #[test]
    fn unknown_code_is_kept() {
        let parsed: NotificationTypeCode = serde_json::from_str("19").unwrap();
        assert_eq!(parsed, NotificationTypeCode::Unknown(19));

        let known: NotificationTypeCode = serde_json::from_str("12").unwrap();
        assert_eq!(
            known,
            NotificationTypeCode::Known(SubscriptionNotificationType::SubscriptionRevoked)
        );
    }

    #[test]
    fn non_numeric_code_is_rejected() {
        let parsed: Result<NotificationTypeCode, _> = serde_json::from_str("\"RENEWED\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn event_time_accepts_string_and_number() {
        let text: EventTimeMillis = serde_json::from_str("\"1700000000000\"").unwrap();
        let number: EventTimeMillis = serde_json::from_str("1700000000000").unwrap();
        assert_eq!(text.as_millis(), Some(1_700_000_000_000));
        assert_eq!(number.as_millis(), Some(1_700_000_000_000));
    }
}
