//! HTTP handler for renewal notifications.
//!
//! Status mapping: 200 for anything acknowledged (including no-ops,
//! anomalies and duplicates), 400 for a malformed envelope or payload, 403
//! for failed authentication, 500 for transient failures the provider
//! should redeliver.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::application::{ReconcileNotificationCommand, ReconcileNotificationHandler};
use crate::domain::billing::{Credentials, DecodeError, WebhookAuthenticator, WebhookError};

use super::dto::{AckResponse, ErrorResponse, PushEnvelope, WebhookQuery};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct WebhookAppState {
    pub authenticator: Arc<WebhookAuthenticator>,
    pub handler: Arc<ReconcileNotificationHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/renewals - Receive a provider push notification
pub async fn receive_renewal_notification(
    State(state): State<WebhookAppState>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let envelope: PushEnvelope = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(
            error_kind = "decode_failure",
            error = %e,
            "Rejected malformed push envelope"
        );
        WebhookError::Decode(DecodeError::Envelope(e.to_string()))
    })?;

    state
        .authenticator
        .authenticate(&Credentials {
            token: query.token.as_deref(),
            subscription: envelope.subscription.as_deref(),
        })
        .map_err(|e| {
            tracing::warn!(error_kind = "auth_failure", error = %e, "Rejected webhook delivery");
            WebhookError::Unauthorized(e)
        })?;

    let cmd = ReconcileNotificationCommand {
        message: envelope.message.into(),
    };
    let result = state.handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(AckResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts webhook errors to HTTP responses.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let message = match &self.0 {
            // Don't tell an unauthenticated caller which check failed.
            WebhookError::Unauthorized(_) => "Forbidden".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.error_code(), message, self.0.is_retryable());
        (status, Json(body)).into_response()
    }
}
