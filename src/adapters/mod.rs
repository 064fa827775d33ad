//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `google_play` - RTDN decoder and Developer API client
//! - `postgres` - Subscription ledger and notification store
//! - `memory` - In-memory ports for tests and local runs
//! - `audit` - Audit sinks
//! - `http` - Webhook endpoint

pub mod audit;
pub mod google_play;
pub mod http;
pub mod memory;
pub mod postgres;

pub use audit::{InMemoryAuditSink, TracingAuditSink};
pub use google_play::{GooglePlayDeveloperApiClient, GooglePlayNotificationDecoder, StaticAccessTokenSource};
pub use postgres::{PostgresProcessedNotificationStore, PostgresSubscriptionLedger};
