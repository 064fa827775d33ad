//! In-memory adapters.
//!
//! Implement the persistence and provider ports without a database or
//! network, for tests and for running the service locally.

mod processed_notification_store;
mod subscription_ledger;
mod subscription_state_fetcher;

pub use processed_notification_store::InMemoryProcessedNotificationStore;
pub use subscription_ledger::{InMemorySubscriptionLedger, LedgerFault};
pub use subscription_state_fetcher::InMemorySubscriptionStateFetcher;
