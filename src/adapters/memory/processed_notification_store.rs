//! In-memory ProcessedNotificationStore for tests and local runs.
//!
//! A single write lock around the map gives `admit` the same
//! insert-or-reclaim atomicity the database gets from its unique key.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    AdmitResult, NotificationOutcome, ProcessedNotification, ProcessedNotificationStore,
};

#[derive(Default)]
pub struct InMemoryProcessedNotificationStore {
    records: RwLock<HashMap<String, ProcessedNotification>>,
}

impl InMemoryProcessedNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// True when nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Overwrites a record, bypassing claim rules.
    pub async fn put(&self, record: ProcessedNotification) {
        self.records
            .write()
            .await
            .insert(record.notification_id.clone(), record);
    }
}

fn not_found(notification_id: &str) -> DomainError {
    DomainError::new(
        ErrorCode::NotificationNotFound,
        format!("Notification not found: {}", notification_id),
    )
}

#[async_trait]
impl ProcessedNotificationStore for InMemoryProcessedNotificationStore {
    async fn admit(
        &self,
        notification: &ProcessedNotification,
        lapsed_before: Timestamp,
    ) -> Result<AdmitResult, DomainError> {
        let mut records = self.records.write().await;
        match records.get_mut(&notification.notification_id) {
            None => {
                records.insert(notification.notification_id.clone(), notification.clone());
                Ok(AdmitResult::Admitted {
                    attempt: notification.attempts,
                })
            }
            Some(existing) if existing.is_reclaimable(lapsed_before) => {
                existing.attempts += 1;
                existing.claimed_at = notification.claimed_at;
                Ok(AdmitResult::Admitted {
                    attempt: existing.attempts,
                })
            }
            Some(_) => Ok(AdmitResult::Duplicate),
        }
    }

    async fn mark_processed(
        &self,
        notification_id: &str,
        outcome: NotificationOutcome,
        detail: Option<&str>,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(notification_id)
            .ok_or_else(|| not_found(notification_id))?;
        record.processed = true;
        record.outcome = Some(outcome);
        record.detail = detail.map(str::to_string);
        record.claimed_at = None;
        record.processed_at = Some(processed_at);
        Ok(())
    }

    async fn release(&self, notification_id: &str, error: &str) -> Result<(), DomainError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(notification_id)
            .ok_or_else(|| not_found(notification_id))?;
        if !record.processed {
            record.claimed_at = None;
            record.last_error = Some(error.to_string());
        }
        Ok(())
    }

    async fn find(&self, notification_id: &str) -> Result<Option<ProcessedNotification>, DomainError> {
        Ok(self.records.read().await.get(notification_id).cloned())
    }

    async fn find_retryable(
        &self,
        lapsed_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<ProcessedNotification>, DomainError> {
        let records = self.records.read().await;
        let mut retryable: Vec<_> = records
            .values()
            .filter(|r| r.is_reclaimable(lapsed_before))
            .cloned()
            .collect();
        retryable.sort_by_key(|r| r.received_at);
        retryable.truncate(limit as usize);
        Ok(retryable)
    }

    async fn list_anomalies(&self, limit: u32) -> Result<Vec<ProcessedNotification>, DomainError> {
        let records = self.records.read().await;
        let mut anomalies: Vec<_> = records
            .values()
            .filter(|r| r.outcome == Some(NotificationOutcome::Anomaly))
            .cloned()
            .collect();
        anomalies.sort_by(|a, b| b.processed_at.cmp(&a.processed_at));
        anomalies.truncate(limit as usize);
        Ok(anomalies)
    }

    async fn delete_processed_before(&self, timestamp: Timestamp) -> Result<u64, DomainError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !(r.processed && r.received_at.is_before(&timestamp)));
        Ok((before - records.len()) as u64)
    }
}
