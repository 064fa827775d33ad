//! Static bearer token for the Developer API.
//!
//! Suitable when an external process (sidecar, workload identity) keeps the
//! configured token fresh.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::domain::billing::FetchError;
use crate::ports::AccessTokenSource;

pub struct StaticAccessTokenSource {
    token: SecretString,
}

impl StaticAccessTokenSource {
    pub fn new(token: SecretString) -> Self {
        Self { token }
    }
}

#[async_trait]
impl AccessTokenSource for StaticAccessTokenSource {
    async fn access_token(&self) -> Result<SecretString, FetchError> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(FetchError::Credentials(
                "no provider access token configured".to_string(),
            ));
        }
        Ok(SecretString::new(self.token.expose_secret().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_token() {
        let source = StaticAccessTokenSource::new(SecretString::new("ya29.abc".to_string()));
        let token = source.access_token().await.unwrap();
        assert_eq!(token.expose_secret(), "ya29.abc");
    }

    #[tokio::test]
    async fn empty_token_is_credentials_error() {
        let source = StaticAccessTokenSource::new(SecretString::new(String::new()));
        assert!(matches!(
            source.access_token().await,
            Err(FetchError::Credentials(_))
        ));
    }
}
