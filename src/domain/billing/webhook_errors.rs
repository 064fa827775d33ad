//! Error types for renewal webhook handling.
//!
//! Maps every failure to an HTTP status and retryability. The provider
//! redelivers on 5xx and stops on 2xx/4xx.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::AuthError;

/// Errors from decoding a provider payload. All map to 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Malformed envelope: {0}")]
    Envelope(String),

    #[error("Invalid base64 payload: {0}")]
    Base64(String),

    #[error("Malformed notification: {0}")]
    Payload(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unexpected package name: {0}")]
    PackageMismatch(String),
}

/// Errors from querying the provider for current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Provider query timed out")]
    Timeout,

    #[error("Provider unreachable: {0}")]
    Unreachable(String),

    #[error("Purchase token not recognised by provider")]
    InvalidToken,

    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Unreadable provider response: {0}")]
    Malformed(String),

    #[error("Provider credentials unavailable: {0}")]
    Credentials(String),
}

/// Errors surfaced by the reconciliation endpoint.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Request did not come from the provider.
    #[error("Authentication failed: {0}")]
    Unauthorized(#[from] AuthError),

    /// Envelope or payload could not be decoded.
    #[error("Decode failure: {0}")]
    Decode(#[from] DecodeError),

    /// Provider state could not be fetched.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Ledger write exceeded its time budget.
    #[error("Ledger write timed out")]
    LedgerTimeout,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// Returns true if the provider should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WebhookError::Fetch(_) | WebhookError::LedgerTimeout | WebhookError::Database(_)
        )
    }

    /// Maps the error to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized(_) => StatusCode::FORBIDDEN,
            WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
            WebhookError::Fetch(_) | WebhookError::LedgerTimeout | WebhookError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable code for logs and response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            WebhookError::Unauthorized(_) => "UNAUTHORIZED",
            WebhookError::Decode(_) => "DECODE_FAILURE",
            WebhookError::Fetch(_) => "FETCH_FAILED",
            WebhookError::LedgerTimeout => "LEDGER_TIMEOUT",
            WebhookError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Database(err.to_string())
    }
}
