//! HTTP adapters - REST endpoint implementations.

pub mod webhook;

pub use webhook::{webhook_router, WebhookAppState};
