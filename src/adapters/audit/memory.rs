//! Audit sink that keeps entries in memory for assertions.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{AuditEntry, AuditSink};

#[derive(Default)]
pub struct InMemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().await.clone()
    }

    /// Most recently recorded entry.
    pub async fn last(&self) -> Option<AuditEntry> {
        self.entries.lock().await.last().cloned()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(&self, entry: AuditEntry) {
        self.entries.lock().await.push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::RenewalEventKind;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn keeps_entries_in_order() {
        let sink = InMemoryAuditSink::new();
        for disposition in ["applied", "no_op"] {
            sink.record(AuditEntry {
                notification_id: Some("n1".to_string()),
                purchase_token: "tok".to_string(),
                kind: RenewalEventKind::Renewed,
                subscription_id: None,
                recurring_status: None,
                disposition: disposition.to_string(),
                reason: None,
                recorded_at: Timestamp::now(),
            })
            .await;
        }

        let entries = sink.entries().await;
        assert_eq!(entries.len(), 2);
        assert_eq!(sink.last().await.unwrap().disposition, "no_op");
    }
}
