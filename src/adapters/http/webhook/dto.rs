//! Request and response DTOs for the renewal webhook.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::application::ReconcileNotificationResult;
use crate::ports::InboundMessage;

/// Query string of a push delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookQuery {
    /// Shared verification token configured on the push subscription.
    pub token: Option<String>,
}

/// Pub/Sub push envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEnvelope {
    pub message: PushMessage,

    /// Full push subscription name, e.g. `projects/p/subscriptions/s`.
    #[serde(default)]
    pub subscription: Option<String>,
}

/// Pub/Sub message. Push deliveries carry ids and publish times in both
/// camelCase and snake_case.
#[derive(Debug, Clone, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub data: Option<String>,

    #[serde(default, rename = "messageId")]
    pub message_id: Option<String>,

    #[serde(default, rename = "message_id")]
    pub message_id_snake: Option<String>,

    #[serde(default, rename = "publishTime")]
    pub publish_time: Option<String>,

    #[serde(default, rename = "publish_time")]
    pub publish_time_snake: Option<String>,

    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl From<PushMessage> for InboundMessage {
    fn from(message: PushMessage) -> Self {
        InboundMessage {
            message_id: message
                .message_id
                .or(message.message_id_snake)
                .filter(|id| !id.trim().is_empty()),
            data: message.data.unwrap_or_default(),
            publish_time: message.publish_time.or(message.publish_time_snake),
            attributes: message.attributes,
        }
    }
}

/// Body of every 200 response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AckResponse {
    /// `applied`, `no_op`, `anomaly`, `already_applied`, `duplicate`,
    /// `test` or `unsupported`.
    pub outcome: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<ReconcileNotificationResult> for AckResponse {
    fn from(result: ReconcileNotificationResult) -> Self {
        match result {
            ReconcileNotificationResult::Reconciled {
                notification_id,
                disposition,
                ..
            } => AckResponse {
                outcome: disposition.as_str().to_string(),
                notification_id,
                reason: disposition.reason().map(str::to_string),
            },
            ReconcileNotificationResult::Duplicate { notification_id } => AckResponse {
                outcome: "duplicate".to_string(),
                notification_id: Some(notification_id),
                reason: None,
            },
            ReconcileNotificationResult::TestNotification => AckResponse {
                outcome: "test".to_string(),
                notification_id: None,
                reason: None,
            },
            ReconcileNotificationResult::Unsupported { kind } => AckResponse {
                outcome: "unsupported".to_string(),
                notification_id: None,
                reason: Some(kind),
            },
        }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Retry hint for the provider.
    pub retryable: bool,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::Disposition;
    use serde_json::json;

    #[test]
    fn envelope_accepts_both_id_spellings() {
        let envelope: PushEnvelope = serde_json::from_value(json!({
            "message": {
                "data": "e30=",
                "messageId": "136969346945",
                "message_id": "136969346945",
                "publishTime": "2024-01-01T00:00:00Z",
                "publish_time": "2024-01-01T00:00:00Z"
            },
            "subscription": "projects/acme/subscriptions/play"
        }))
        .unwrap();

        let inbound = InboundMessage::from(envelope.message);

        assert_eq!(inbound.message_id.as_deref(), Some("136969346945"));
        assert_eq!(inbound.data, "e30=");
        assert_eq!(envelope.subscription.as_deref(), Some("projects/acme/subscriptions/play"));
    }

    #[test]
    fn snake_case_id_is_used_when_alone() {
        let message: PushMessage =
            serde_json::from_value(json!({ "data": "e30=", "message_id": "42" })).unwrap();
        assert_eq!(InboundMessage::from(message).message_id.as_deref(), Some("42"));
    }

    #[test]
    fn blank_id_is_treated_as_absent() {
        let message: PushMessage =
            serde_json::from_value(json!({ "data": "e30=", "messageId": "  " })).unwrap();
        assert!(InboundMessage::from(message).message_id.is_none());
    }

    #[test]
    fn ack_carries_anomaly_reason() {
        let ack = AckResponse::from(ReconcileNotificationResult::Reconciled {
            notification_id: Some("n1".to_string()),
            subscription_id: None,
            recurring_status: None,
            disposition: Disposition::Anomaly("no local subscription".to_string()),
        });
        assert_eq!(ack.outcome, "anomaly");
        assert_eq!(ack.reason.as_deref(), Some("no local subscription"));
    }
}
