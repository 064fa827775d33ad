//! Payment provider (Google Play Developer API) configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Provider API access settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Application package name; notifications for any other package are rejected.
    pub package_name: String,

    /// OAuth bearer token for the Developer API.
    pub access_token: SecretString,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Upper bound on one provider query, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate provider configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.package_name.trim().is_empty() {
            return Err(ValidationError::MissingRequired("provider.package_name"));
        }
        if self.access_token.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("provider.access_token"));
        }
        if *environment != Environment::Development && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::ProviderUrlMustBeHttps);
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 60 {
            return Err(ValidationError::InvalidTimeout("provider.request_timeout_secs"));
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://androidpublisher.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
