//! AuditSink port - One structured record per reconciled notification.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::billing::{RecurringStatus, RenewalEventKind};
use crate::domain::foundation::{SubscriptionId, Timestamp};

/// Audit record for one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub notification_id: Option<String>,
    pub purchase_token: String,
    pub kind: RenewalEventKind,
    pub subscription_id: Option<SubscriptionId>,
    pub recurring_status: Option<RecurringStatus>,

    /// `applied`, `no_op`, `anomaly` or `already_applied`.
    pub disposition: String,
    pub reason: Option<String>,
    pub recorded_at: Timestamp,
}

/// Destination for audit records.
///
/// Sinks must not fail the request; delivery problems are theirs to log.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry);
}
