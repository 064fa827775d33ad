//! Scriptable SubscriptionStateFetcher for tests and local runs.
//!
//! Snapshots are registered per purchase token. Queued failures are
//! returned (one per call) before any snapshot.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::billing::{FetchError, ProviderSubscriptionSnapshot};
use crate::ports::SubscriptionStateFetcher;

#[derive(Default)]
struct FetcherState {
    snapshots: HashMap<String, ProviderSubscriptionSnapshot>,
    failures: VecDeque<FetchError>,
    delay: Option<Duration>,
    calls: Vec<(String, String)>,
}

#[derive(Default)]
pub struct InMemorySubscriptionStateFetcher {
    state: Mutex<FetcherState>,
}

impl InMemorySubscriptionStateFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the snapshot returned for `purchase_token`.
    pub async fn set_snapshot(
        &self,
        purchase_token: impl Into<String>,
        snapshot: ProviderSubscriptionSnapshot,
    ) {
        self.state
            .lock()
            .await
            .snapshots
            .insert(purchase_token.into(), snapshot);
    }

    /// Queues a failure for the next call.
    pub async fn fail_next(&self, error: FetchError) {
        self.state.lock().await.failures.push_back(error);
    }

    /// Delays every response, for timeout tests.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        self.state.lock().await.delay = delay;
    }

    /// `(product_id, purchase_token)` of every call so far.
    pub async fn calls(&self) -> Vec<(String, String)> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl SubscriptionStateFetcher for InMemorySubscriptionStateFetcher {
    async fn fetch(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<ProviderSubscriptionSnapshot, FetchError> {
        let (result, delay) = {
            let mut state = self.state.lock().await;
            state
                .calls
                .push((product_id.to_string(), purchase_token.to_string()));
            let result = match state.failures.pop_front() {
                Some(error) => Err(error),
                None => state
                    .snapshots
                    .get(purchase_token)
                    .cloned()
                    .ok_or(FetchError::InvalidToken),
            };
            (result, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }
}
