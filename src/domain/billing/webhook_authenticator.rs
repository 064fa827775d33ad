//! Inbound webhook authentication.
//!
//! Push deliveries carry a shared verification token in the query string.
//! The token is compared in constant time. Without a configured token the
//! authenticator fails closed, except in the explicit development bypass.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Authentication failures. All map to 403.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No verification token configured")]
    NotConfigured,

    #[error("Missing verification token")]
    MissingToken,

    #[error("Invalid verification token")]
    InvalidToken,

    #[error("Unexpected push subscription")]
    SubscriptionMismatch,
}

/// What the inbound request presented.
#[derive(Debug, Clone, Copy, Default)]
pub struct Credentials<'a> {
    /// `?token=` query parameter.
    pub token: Option<&'a str>,

    /// Push subscription name from the envelope.
    pub subscription: Option<&'a str>,
}

enum Mode {
    Token(SecretString),
    Unauthenticated,
    Unconfigured,
}

/// Verifies that a webhook request originates from the provider.
pub struct WebhookAuthenticator {
    mode: Mode,
    expected_subscription: Option<String>,
}

impl WebhookAuthenticator {
    /// Creates an authenticator that requires `token` on every request.
    pub fn with_token(token: SecretString) -> Self {
        let mode = if token.expose_secret().is_empty() {
            Mode::Unconfigured
        } else {
            Mode::Token(token)
        };
        Self {
            mode,
            expected_subscription: None,
        }
    }

    /// Builds the authenticator from configuration.
    ///
    /// The bypass is honored only when `allow_unauthenticated` is set and the
    /// process runs in development; a configured token always wins.
    pub fn from_settings(
        token: Option<SecretString>,
        expected_subscription: Option<String>,
        allow_unauthenticated: bool,
        is_development: bool,
    ) -> Self {
        let mut authenticator = match token {
            Some(token) => Self::with_token(token),
            None => Self {
                mode: Mode::Unconfigured,
                expected_subscription: None,
            },
        };
        if matches!(authenticator.mode, Mode::Unconfigured) && allow_unauthenticated && is_development {
            tracing::warn!("webhook authentication DISABLED: accepting unauthenticated deliveries");
            authenticator.mode = Mode::Unauthenticated;
        }
        authenticator.expected_subscription = expected_subscription.filter(|s| !s.is_empty());
        authenticator
    }

    /// Also require the envelope's push subscription to match.
    pub fn expect_subscription(mut self, subscription: impl Into<String>) -> Self {
        self.expected_subscription = Some(subscription.into());
        self
    }

    /// True when running with the development bypass.
    pub fn is_bypassed(&self) -> bool {
        matches!(self.mode, Mode::Unauthenticated)
    }

    /// Authenticates a request.
    ///
    /// # Errors
    ///
    /// - `NotConfigured` - no token configured and no bypass
    /// - `MissingToken` / `InvalidToken` - token absent or wrong
    /// - `SubscriptionMismatch` - envelope names an unexpected subscription
    pub fn authenticate(&self, credentials: &Credentials<'_>) -> Result<(), AuthError> {
        match &self.mode {
            Mode::Unconfigured => return Err(AuthError::NotConfigured),
            Mode::Unauthenticated => {
                tracing::warn!("accepting unauthenticated webhook delivery (development bypass)");
                return Ok(());
            }
            Mode::Token(expected) => {
                let presented = credentials.token.ok_or(AuthError::MissingToken)?;
                if !constant_time_compare(presented.as_bytes(), expected.expose_secret().as_bytes()) {
                    return Err(AuthError::InvalidToken);
                }
            }
        }

        if let Some(expected) = &self.expected_subscription {
            let presented = credentials.subscription.unwrap_or_default();
            if !constant_time_compare(presented.as_bytes(), expected.as_bytes()) {
                return Err(AuthError::SubscriptionMismatch);
            }
        }

        Ok(())
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
