//! Webhook authentication configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// How inbound push deliveries are authenticated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    /// Shared token expected in the push endpoint's `?token=` query.
    pub verification_token: Option<SecretString>,

    /// Full push subscription name the envelope must carry, if set.
    pub expected_subscription: Option<String>,

    /// Accept deliveries with no token. Development only.
    #[serde(default)]
    pub allow_unauthenticated: bool,
}

impl WebhookConfig {
    /// The configured token, ignoring a blank value.
    pub fn token(&self) -> Option<SecretString> {
        self.verification_token
            .as_ref()
            .filter(|t| !t.expose_secret().trim().is_empty())
            .cloned()
    }

    /// Validate webhook configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.allow_unauthenticated && *environment != Environment::Development {
            return Err(ValidationError::UnauthenticatedOutsideDevelopment);
        }
        if self.token().is_none() && !self.allow_unauthenticated {
            return Err(ValidationError::MissingRequired("webhook.verification_token"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token(token: &str) -> WebhookConfig {
        WebhookConfig {
            verification_token: Some(SecretString::new(token.to_string())),
            ..Default::default()
        }
    }

    #[test]
    fn test_token_required() {
        let config = WebhookConfig::default();
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::MissingRequired("webhook.verification_token"))
        );
    }

    #[test]
    fn test_blank_token_counts_as_missing() {
        let config = with_token("   ");
        assert!(config.token().is_none());
        assert!(config.validate(&Environment::Development).is_err());
    }

    #[test]
    fn test_bypass_allowed_in_development() {
        let config = WebhookConfig {
            allow_unauthenticated: true,
            ..Default::default()
        };
        assert!(config.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn test_bypass_refused_outside_development() {
        let config = WebhookConfig {
            allow_unauthenticated: true,
            ..with_token("secret")
        };
        assert_eq!(
            config.validate(&Environment::Staging),
            Err(ValidationError::UnauthenticatedOutsideDevelopment)
        );
        assert_eq!(
            config.validate(&Environment::Production),
            Err(ValidationError::UnauthenticatedOutsideDevelopment)
        );
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let config = with_token("super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
