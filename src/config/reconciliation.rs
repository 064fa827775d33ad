//! Reconciliation pipeline and sweeper configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::{NotificationSweeperConfig, ReconcileSettings};

use super::error::ValidationError;

/// Time budgets for the pipeline and the background sweeper.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Upper bound on one ledger transaction, in seconds.
    #[serde(default = "default_ledger_timeout")]
    pub ledger_timeout_secs: u64,

    /// How long a claim blocks redelivery, in seconds.
    #[serde(default = "default_claim_lease")]
    pub claim_lease_secs: u64,

    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,

    /// Attempts after which the sweeper records a notification as an anomaly.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Days to keep processed notifications; 0 keeps them forever.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
}

impl ReconciliationConfig {
    /// Handler time budgets; the fetch budget comes from the provider section.
    pub fn settings(&self, fetch_timeout: Duration) -> ReconcileSettings {
        ReconcileSettings {
            fetch_timeout,
            ledger_timeout: Duration::from_secs(self.ledger_timeout_secs),
            claim_lease: Duration::from_secs(self.claim_lease_secs),
        }
    }

    pub fn sweeper(&self) -> NotificationSweeperConfig {
        let retention = match self.retention_days {
            0 => None,
            days => Some(Duration::from_secs(days * 24 * 60 * 60)),
        };
        NotificationSweeperConfig::default()
            .with_poll_interval(Duration::from_secs(self.sweep_interval_secs))
            .with_batch_size(self.sweep_batch_size)
            .with_claim_lease(Duration::from_secs(self.claim_lease_secs))
            .with_max_attempts(self.max_attempts)
            .with_retention(retention)
    }

    /// Validate reconciliation configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.ledger_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("reconciliation.ledger_timeout_secs"));
        }
        if self.claim_lease_secs == 0 {
            return Err(ValidationError::InvalidValue("reconciliation.claim_lease_secs"));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidValue("reconciliation.sweep_interval_secs"));
        }
        if self.sweep_batch_size == 0 {
            return Err(ValidationError::InvalidValue("reconciliation.sweep_batch_size"));
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidValue("reconciliation.max_attempts"));
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            ledger_timeout_secs: default_ledger_timeout(),
            claim_lease_secs: default_claim_lease(),
            sweep_interval_secs: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch_size(),
            max_attempts: default_max_attempts(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_ledger_timeout() -> u64 {
    5
}

fn default_claim_lease() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_sweep_batch_size() -> u32 {
    50
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retention_days() -> u64 {
    30
}
