//! SubscriptionStateFetcher port - Authoritative provider state.
//!
//! Notifications are hints; reconciliation always re-reads the provider.

use async_trait::async_trait;

use crate::domain::billing::{FetchError, ProviderSubscriptionSnapshot};

#[async_trait]
pub trait SubscriptionStateFetcher: Send + Sync {
    /// Fetches current state for a purchase.
    ///
    /// # Errors
    ///
    /// Any `FetchError` aborts reconciliation as retryable.
    async fn fetch(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<ProviderSubscriptionSnapshot, FetchError>;
}
