//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! - `PostgresProcessedNotificationStore` - Idempotency guard rows
//! - `PostgresSubscriptionLedger` - Subscriptions, payments and the transactional writer

mod codec;
mod processed_notification_store;
mod subscription_ledger;

pub use processed_notification_store::PostgresProcessedNotificationStore;
pub use subscription_ledger::PostgresSubscriptionLedger;
