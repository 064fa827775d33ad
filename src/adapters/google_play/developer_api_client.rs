//! Google Play Developer API client.
//!
//! Implements `SubscriptionStateFetcher` with `purchases.subscriptionsv2.get`.
//! The product id is not part of the v2 URL; it is only logged.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::billing::{FetchError, ProviderSubscriptionSnapshot};
use crate::ports::{AccessTokenSource, SubscriptionStateFetcher};

use super::developer_api_models::SubscriptionPurchaseV2;

pub const DEFAULT_API_BASE_URL: &str = "https://androidpublisher.googleapis.com";

pub struct GooglePlayDeveloperApiClient {
    http: reqwest::Client,
    api_base_url: String,
    package_name: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl GooglePlayDeveloperApiClient {
    /// Creates a client whose requests are bounded by `timeout`.
    pub fn new(
        api_base_url: impl Into<String>,
        package_name: impl Into<String>,
        tokens: Arc<dyn AccessTokenSource>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Unreachable(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            package_name: package_name.into(),
            tokens,
        })
    }

    fn subscription_url(&self, purchase_token: &str) -> String {
        format!(
            "{}/androidpublisher/v3/applications/{}/purchases/subscriptionsv2/tokens/{}",
            self.api_base_url, self.package_name, purchase_token
        )
    }
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl SubscriptionStateFetcher for GooglePlayDeveloperApiClient {
    async fn fetch(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> Result<ProviderSubscriptionSnapshot, FetchError> {
        let token = self.tokens.access_token().await?;

        tracing::debug!(
            product_id = %product_id,
            package_name = %self.package_name,
            "Querying purchases.subscriptionsv2.get"
        );

        let response = self
            .http
            .get(self.subscription_url(purchase_token))
            .header(AUTHORIZATION, format!("Bearer {}", token.expose_secret()))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::InvalidToken);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                product_id = %product_id,
                "Developer API returned an error"
            );
            return Err(FetchError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let purchase: SubscriptionPurchaseV2 = response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Malformed(e.to_string())
            }
        })?;

        purchase.into_snapshot()
    }
}
