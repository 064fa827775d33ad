//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Inbound
//!
//! - `NotificationDecoder` - Provider payload to `RenewalEvent`
//!
//! ## Outbound
//!
//! - `SubscriptionStateFetcher` - Authoritative provider state
//! - `AccessTokenSource` - Credentials for the provider API
//! - `ProcessedNotificationStore` - Idempotency guard storage
//! - `SubscriptionLedger` - Subscriptions, payments and the transactional writer
//! - `AuditSink` - Structured audit records

mod access_token_source;
mod audit_sink;
mod notification_decoder;
mod processed_notification_store;
mod subscription_ledger;
mod subscription_state_fetcher;

pub use access_token_source::AccessTokenSource;
pub use audit_sink::{AuditEntry, AuditSink};
pub use notification_decoder::{DecodedNotification, InboundMessage, NotificationDecoder};
pub use processed_notification_store::{
    AdmitResult, NotificationOutcome, ProcessedNotification, ProcessedNotificationStore,
};
pub use subscription_ledger::{CommitResult, SubscriptionLedger};
pub use subscription_state_fetcher::SubscriptionStateFetcher;
