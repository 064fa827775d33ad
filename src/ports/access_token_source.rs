//! AccessTokenSource port - Bearer tokens for the provider API.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::domain::billing::FetchError;

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Returns a currently valid bearer token.
    async fn access_token(&self) -> Result<SecretString, FetchError>;
}
