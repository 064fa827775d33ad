//! Axum router configuration for webhook endpoints.

use axum::{routing::post, Router};

use super::handlers::{receive_renewal_notification, WebhookAppState};

/// Create the webhook routes.
///
/// # Routes
/// - `POST /renewals` - Provider renewal notifications (token authenticated)
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/renewals", post(receive_renewal_notification))
}

/// Create the webhook router mounted at `/webhooks`.
pub fn webhook_router(state: WebhookAppState) -> Router {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .with_state(state)
}
