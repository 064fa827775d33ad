//! ProcessedNotificationStore port - Idempotency guard for renewal notifications.
//!
//! Providers deliver at-least-once. Every notification carrying an id gets a
//! row here before any mutation; the row's existence is the dedup signal.
//!
//! ## Claim Semantics
//!
//! A row is inserted claimed (`claimed_at = now`). It is re-admitted only if
//! it is still unprocessed and its claim has lapsed or been released, which
//! is how a redelivery retries a failed fetch. A processed or currently
//! claimed row is a `Duplicate`.

use async_trait::async_trait;

use crate::domain::billing::RenewalEvent;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

/// Final outcome recorded on a processed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Applied,
    NoOp,
    Anomaly,
}

impl NotificationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationOutcome::Applied => "applied",
            NotificationOutcome::NoOp => "no_op",
            NotificationOutcome::Anomaly => "anomaly",
        }
    }

    pub fn parse(s: &str) -> Result<Self, DomainError> {
        match s {
            "applied" => Ok(NotificationOutcome::Applied),
            "no_op" => Ok(NotificationOutcome::NoOp),
            "anomaly" => Ok(NotificationOutcome::Anomaly),
            _ => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid outcome value: {}", s),
            )),
        }
    }
}

/// Persistent record of a received notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedNotification {
    pub notification_id: String,
    pub event_type: String,

    /// Normalized event, replayable by the sweeper.
    pub payload: RenewalEvent,

    pub processed: bool,
    pub outcome: Option<NotificationOutcome>,

    /// No-op or anomaly reason.
    pub detail: Option<String>,

    /// Most recent retryable failure.
    pub last_error: Option<String>,

    pub attempts: u32,
    pub claimed_at: Option<Timestamp>,
    pub received_at: Timestamp,
    pub processed_at: Option<Timestamp>,
}

impl ProcessedNotification {
    /// Creates a freshly claimed, unprocessed record.
    pub fn claim(notification_id: impl Into<String>, event: &RenewalEvent, now: Timestamp) -> Self {
        Self {
            notification_id: notification_id.into(),
            event_type: event.kind.as_str().to_string(),
            payload: event.clone(),
            processed: false,
            outcome: None,
            detail: None,
            last_error: None,
            attempts: 1,
            claimed_at: Some(now),
            received_at: now,
            processed_at: None,
        }
    }

    /// True if an unprocessed row may be taken over by a new attempt.
    pub fn is_reclaimable(&self, lapsed_before: Timestamp) -> bool {
        !self.processed
            && self
                .claimed_at
                .map_or(true, |claimed| claimed.is_before(&lapsed_before))
    }
}

/// Result of the atomic insert-if-absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitResult {
    /// Caller owns the claim; `attempt` counts deliveries including this one.
    Admitted { attempt: u32 },

    /// Already processed or being processed elsewhere.
    Duplicate,
}

/// Port for the idempotency guard's storage.
///
/// Implementations must make `admit` atomic (a unique key on
/// `notification_id` plus a conditional update).
#[async_trait]
pub trait ProcessedNotificationStore: Send + Sync {
    /// Inserts the record, or re-claims an existing unprocessed row whose
    /// claim is older than `lapsed_before` (or released).
    async fn admit(
        &self,
        notification: &ProcessedNotification,
        lapsed_before: Timestamp,
    ) -> Result<AdmitResult, DomainError>;

    /// Flips the single row matched by `notification_id` to processed.
    async fn mark_processed(
        &self,
        notification_id: &str,
        outcome: NotificationOutcome,
        detail: Option<&str>,
        processed_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Releases the claim after a retryable failure so a redelivery can retry.
    async fn release(&self, notification_id: &str, error: &str) -> Result<(), DomainError>;

    /// Finds a record by id.
    async fn find(&self, notification_id: &str) -> Result<Option<ProcessedNotification>, DomainError>;

    /// Unprocessed rows whose claim lapsed before `lapsed_before` or was released,
    /// oldest first.
    async fn find_retryable(
        &self,
        lapsed_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<ProcessedNotification>, DomainError>;

    /// Most recent anomalies, newest first.
    async fn list_anomalies(&self, limit: u32) -> Result<Vec<ProcessedNotification>, DomainError>;

    /// Deletes processed rows received before `timestamp`.
    ///
    /// Returns the number of rows deleted.
    async fn delete_processed_before(&self, timestamp: Timestamp) -> Result<u64, DomainError>;
}
