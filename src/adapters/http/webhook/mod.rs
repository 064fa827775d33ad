//! HTTP adapter for provider webhooks.
//!
//! - `POST /webhooks/renewals?token=…` - Pub/Sub push of renewal notifications

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::{AckResponse, ErrorResponse, PushEnvelope, PushMessage, WebhookQuery};
pub use handlers::{receive_renewal_notification, WebhookApiError, WebhookAppState};
pub use routes::{webhook_router, webhook_routes};
