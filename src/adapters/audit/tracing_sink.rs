//! Audit sink that emits one structured `tracing` event per notification.
//!
//! Events use `target: "audit"` so they can be routed or filtered
//! independently of application logs (e.g. `RUST_LOG=audit=info`).

use async_trait::async_trait;

use crate::ports::{AuditEntry, AuditSink};

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            notification_id = entry.notification_id.as_deref().unwrap_or("-"),
            purchase_token = %entry.purchase_token,
            kind = %entry.kind,
            subscription_id = ?entry.subscription_id.map(|id| id.to_string()),
            recurring_status = ?entry.recurring_status,
            disposition = %entry.disposition,
            reason = entry.reason.as_deref().unwrap_or(""),
            recorded_at = %entry.recorded_at,
            "renewal notification reconciled"
        );
    }
}
