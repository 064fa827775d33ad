//! Google Play RTDN decoder.
//!
//! Turns a Pub/Sub push message into a `DecodedNotification`: base64-decode
//! `data`, parse the `DeveloperNotification`, cross-check the package name,
//! then map the numeric subscription notification type.

use base64::{prelude::BASE64_STANDARD, Engine as _};

use crate::domain::billing::{DecodeError, RenewalEvent, RenewalEventKind};
use crate::domain::foundation::{Timestamp, ValidationError};
use crate::ports::{DecodedNotification, InboundMessage, NotificationDecoder};

use super::rtdn_models::{DeveloperNotification, NotificationTypeCode};

pub struct GooglePlayNotificationDecoder {
    expected_package: Option<String>,
}

impl GooglePlayNotificationDecoder {
    /// Decoder that rejects notifications for any other package.
    pub fn new(expected_package: impl Into<String>) -> Self {
        let package = expected_package.into();
        Self {
            expected_package: (!package.trim().is_empty()).then_some(package),
        }
    }

    /// Decoder that accepts any package.
    pub fn any_package() -> Self {
        Self {
            expected_package: None,
        }
    }
}

impl NotificationDecoder for GooglePlayNotificationDecoder {
    fn decode(&self, message: &InboundMessage) -> Result<DecodedNotification, DecodeError> {
        if message.data.trim().is_empty() {
            return Err(DecodeError::MissingField("message.data"));
        }

        let raw = BASE64_STANDARD
            .decode(message.data.trim())
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
        let notification: DeveloperNotification =
            serde_json::from_slice(&raw).map_err(|e| DecodeError::Payload(e.to_string()))?;

        if let Some(expected) = &self.expected_package {
            if &notification.package_name != expected {
                return Err(DecodeError::PackageMismatch(notification.package_name));
            }
        }

        if notification.test_notification.is_some() {
            return Ok(DecodedNotification::Test);
        }
        if notification.one_time_product_notification.is_some() {
            return Ok(DecodedNotification::Unsupported(
                "oneTimeProductNotification".to_string(),
            ));
        }
        if notification.voided_purchase_notification.is_some() {
            return Ok(DecodedNotification::Unsupported(
                "voidedPurchaseNotification".to_string(),
            ));
        }

        let subscription = notification
            .subscription_notification
            .ok_or(DecodeError::MissingField("subscriptionNotification"))?;

        let kind = match subscription.notification_type {
            NotificationTypeCode::Known(code) => RenewalEventKind::from(code),
            NotificationTypeCode::Unknown(code) => {
                return Ok(DecodedNotification::Unsupported(format!(
                    "subscriptionNotification type {}",
                    code
                )));
            }
        };
        let event = RenewalEvent::new(
            message.message_id.clone(),
            kind,
            subscription.purchase_token,
            subscription.subscription_id,
        )
        .map_err(|e| match e {
            ValidationError::EmptyField { field } if field == "purchase_token" => {
                DecodeError::MissingField("purchaseToken")
            }
            ValidationError::EmptyField { .. } => DecodeError::MissingField("subscriptionId"),
            other => DecodeError::Payload(other.to_string()),
        })?;

        let event = match notification.event_time_millis.as_ref() {
            Some(millis) => {
                let millis = millis.as_millis().ok_or_else(|| {
                    DecodeError::Payload("eventTimeMillis is not an integer".to_string())
                })?;
                let at = Timestamp::from_unix_millis("eventTimeMillis", millis)
                    .map_err(|e| DecodeError::Payload(e.to_string()))?;
                event.with_event_time(at)
            }
            None => event,
        };

        Ok(DecodedNotification::Renewal(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(payload: serde_json::Value) -> InboundMessage {
        InboundMessage {
            message_id: Some("msg-1".to_string()),
            data: BASE64_STANDARD.encode(payload.to_string()),
            ..Default::default()
        }
    }

    fn subscription_payload(code: impl serde::Serialize) -> serde_json::Value {
        json!({
            "version": "1.0",
            "packageName": "com.example.app",
            "eventTimeMillis": "1700000000000",
            "subscriptionNotification": {
                "version": "1.0",
                "notificationType": code,
                "purchaseToken": "tok-abc",
                "subscriptionId": "monthly"
            }
        })
    }

    fn decoder() -> GooglePlayNotificationDecoder {
        GooglePlayNotificationDecoder::new("com.example.app")
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Notification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn decodes_renewal() {
        let decoded = decoder().decode(&message(subscription_payload(2))).unwrap();

        let DecodedNotification::Renewal(event) = decoded else {
            panic!("expected renewal, got {:?}", decoded);
        };
        assert_eq!(event.kind, RenewalEventKind::Renewed);
        assert_eq!(event.event_id.as_deref(), Some("msg-1"));
        assert_eq!(event.purchase_token, "tok-abc");
        assert_eq!(event.product_id, "monthly");
        assert_eq!(
            event.event_time,
            Some(Timestamp::from_unix_millis("t", 1_700_000_000_000).unwrap())
        );
    }

    #[test]
    fn missing_message_id_leaves_event_id_empty() {
        let mut msg = message(subscription_payload(5));
        msg.message_id = None;

        let decoded = decoder().decode(&msg).unwrap();

        let DecodedNotification::Renewal(event) = decoded else {
            panic!("expected renewal");
        };
        assert!(event.event_id.is_none());
        assert_eq!(event.kind, RenewalEventKind::OnHold);
    }

    #[test]
    fn pending_purchase_canceled_is_decoded() {
        let decoded = decoder().decode(&message(subscription_payload(20))).unwrap();
        assert!(matches!(
            decoded,
            DecodedNotification::Renewal(RenewalEvent {
                kind: RenewalEventKind::PendingPurchaseCanceled,
                ..
            })
        ));
    }

    #[test]
    fn empty_purchase_token_is_missing_field() {
        let mut payload = subscription_payload(2);
        payload["subscriptionNotification"]["purchaseToken"] = json!("");

        let err = decoder().decode(&message(payload)).unwrap_err();

        assert_eq!(err, DecodeError::MissingField("purchaseToken"));
    }

    // ══════════════════════════════════════════════════════════════
    // Other Notification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn test_notification_is_acknowledged() {
        let payload = json!({
            "version": "1.0",
            "packageName": "com.example.app",
            "eventTimeMillis": "1700000000000",
            "testNotification": { "version": "1.0" }
        });

        assert_eq!(
            decoder().decode(&message(payload)).unwrap(),
            DecodedNotification::Test
        );
    }

    #[test]
    fn unknown_subscription_type_is_unsupported() {
        let decoded = decoder().decode(&message(subscription_payload(19))).unwrap();

        assert_eq!(
            decoded,
            DecodedNotification::Unsupported("subscriptionNotification type 19".to_string())
        );
    }

    #[test]
    fn voided_purchase_is_unsupported() {
        let payload = json!({
            "version": "1.0",
            "packageName": "com.example.app",
            "eventTimeMillis": "1700000000000",
            "voidedPurchaseNotification": {
                "purchaseToken": "tok",
                "orderId": "GPA.1",
                "productType": 1,
                "refundType": 1
            }
        });

        assert!(matches!(
            decoder().decode(&message(payload)).unwrap(),
            DecodedNotification::Unsupported(_)
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Failure Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invalid_base64_fails() {
        let msg = InboundMessage {
            data: "%%%not-base64%%%".to_string(),
            ..Default::default()
        };
        assert!(matches!(decoder().decode(&msg), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn non_json_payload_fails() {
        let msg = InboundMessage {
            data: BASE64_STANDARD.encode("hello"),
            ..Default::default()
        };
        assert!(matches!(decoder().decode(&msg), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn non_numeric_notification_type_fails() {
        let result = decoder().decode(&message(subscription_payload(json!("RENEWED"))));
        assert!(matches!(result, Err(DecodeError::Payload(_))));
    }

    #[test]
    fn empty_data_is_missing_field() {
        let msg = InboundMessage::default();
        assert_eq!(
            decoder().decode(&msg),
            Err(DecodeError::MissingField("message.data"))
        );
    }

    #[test]
    fn other_package_is_rejected() {
        let mut payload = subscription_payload(2);
        payload["packageName"] = json!("com.other.app");

        let err = decoder().decode(&message(payload)).unwrap_err();

        assert_eq!(err, DecodeError::PackageMismatch("com.other.app".to_string()));
    }

    #[test]
    fn any_package_accepts_everything() {
        let mut payload = subscription_payload(2);
        payload["packageName"] = json!("com.other.app");

        let decoded = GooglePlayNotificationDecoder::any_package()
            .decode(&message(payload))
            .unwrap();

        assert!(matches!(decoded, DecodedNotification::Renewal(_)));
    }

    #[test]
    fn missing_subscription_notification_fails() {
        let payload = json!({
            "version": "1.0",
            "packageName": "com.example.app"
        });
        assert_eq!(
            decoder().decode(&message(payload)),
            Err(DecodeError::MissingField("subscriptionNotification"))
        );
    }
}
