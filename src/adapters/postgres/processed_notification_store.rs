//! PostgreSQL implementation of ProcessedNotificationStore.
//!
//! `admit` is a single `INSERT ... ON CONFLICT DO UPDATE ... WHERE ...
//! RETURNING` statement: a returned row means the caller holds the claim,
//! no row means the notification is processed or claimed elsewhere.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::billing::RenewalEvent;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{
    AdmitResult, NotificationOutcome, ProcessedNotification, ProcessedNotificationStore,
};

pub struct PostgresProcessedNotificationStore {
    pool: PgPool,
}

impl PostgresProcessedNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProcessedNotificationRow {
    notification_id: String,
    event_type: String,
    payload: Json<RenewalEvent>,
    processed: bool,
    outcome: Option<String>,
    detail: Option<String>,
    last_error: Option<String>,
    attempts: i32,
    claimed_at: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
}

impl TryFrom<ProcessedNotificationRow> for ProcessedNotification {
    type Error = DomainError;

    fn try_from(row: ProcessedNotificationRow) -> Result<Self, Self::Error> {
        Ok(ProcessedNotification {
            notification_id: row.notification_id,
            event_type: row.event_type,
            payload: row.payload.0,
            processed: row.processed,
            outcome: row
                .outcome
                .as_deref()
                .map(NotificationOutcome::parse)
                .transpose()?,
            detail: row.detail,
            last_error: row.last_error,
            attempts: row.attempts.max(0) as u32,
            claimed_at: row.claimed_at.map(Timestamp::from_datetime),
            received_at: Timestamp::from_datetime(row.received_at),
            processed_at: row.processed_at.map(Timestamp::from_datetime),
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT notification_id, event_type, payload, processed, outcome, detail,
           last_error, attempts, claimed_at, received_at, processed_at
    FROM processed_notifications
"#;

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn rows_to_records(
    rows: Vec<ProcessedNotificationRow>,
) -> Result<Vec<ProcessedNotification>, DomainError> {
    rows.into_iter().map(ProcessedNotification::try_from).collect()
}

#[async_trait]
impl ProcessedNotificationStore for PostgresProcessedNotificationStore {
    async fn admit(
        &self,
        notification: &ProcessedNotification,
        lapsed_before: Timestamp,
    ) -> Result<AdmitResult, DomainError> {
        let claimed_at = notification.claimed_at.map(|t| *t.as_datetime());

        let row: Option<(i32,)> = sqlx::query_as(
            r#"
            INSERT INTO processed_notifications (
                notification_id, event_type, payload, processed, attempts,
                claimed_at, received_at
            )
            VALUES ($1, $2, $3, FALSE, $4, $5, $6)
            ON CONFLICT (notification_id) DO UPDATE
            SET claimed_at = EXCLUDED.claimed_at,
                attempts = processed_notifications.attempts + 1
            WHERE processed_notifications.processed = FALSE
              AND (processed_notifications.claimed_at IS NULL
                   OR processed_notifications.claimed_at < $7)
            RETURNING attempts
            "#,
        )
        .bind(&notification.notification_id)
        .bind(&notification.event_type)
        .bind(Json(&notification.payload))
        .bind(notification.attempts as i32)
        .bind(claimed_at)
        .bind(notification.received_at.as_datetime())
        .bind(lapsed_before.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("admit notification", e))?;

        Ok(match row {
            Some((attempts,)) => AdmitResult::Admitted {
                attempt: attempts.max(0) as u32,
            },
            None => AdmitResult::Duplicate,
        })
    }

    async fn mark_processed(
        &self,
        notification_id: &str,
        outcome: NotificationOutcome,
        detail: Option<&str>,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE processed_notifications
            SET processed = TRUE, outcome = $2, detail = $3,
                claimed_at = NULL, processed_at = $4
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .bind(outcome.as_str())
        .bind(detail)
        .bind(processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("mark notification processed", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::NotificationNotFound,
                format!("Notification not found: {}", notification_id),
            ));
        }
        Ok(())
    }

    async fn release(&self, notification_id: &str, error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE processed_notifications
            SET claimed_at = NULL, last_error = $2
            WHERE notification_id = $1 AND processed = FALSE
            "#,
        )
        .bind(notification_id)
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("release notification claim", e))?;
        Ok(())
    }

    async fn find(&self, notification_id: &str) -> Result<Option<ProcessedNotification>, DomainError> {
        let row: Option<ProcessedNotificationRow> =
            sqlx::query_as(&format!("{} WHERE notification_id = $1", SELECT_COLUMNS))
                .bind(notification_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find notification", e))?;

        row.map(ProcessedNotification::try_from).transpose()
    }

    async fn find_retryable(
        &self,
        lapsed_before: Timestamp,
        limit: u32,
    ) -> Result<Vec<ProcessedNotification>, DomainError> {
        let rows: Vec<ProcessedNotificationRow> = sqlx::query_as(&format!(
            "{} WHERE processed = FALSE AND (claimed_at IS NULL OR claimed_at < $1) \
             ORDER BY received_at LIMIT $2",
            SELECT_COLUMNS
        ))
        .bind(lapsed_before.as_datetime())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("find retryable notifications", e))?;

        rows_to_records(rows)
    }

    async fn list_anomalies(&self, limit: u32) -> Result<Vec<ProcessedNotification>, DomainError> {
        let rows: Vec<ProcessedNotificationRow> = sqlx::query_as(&format!(
            "{} WHERE outcome = 'anomaly' ORDER BY processed_at DESC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list anomalies", e))?;

        rows_to_records(rows)
    }

    async fn delete_processed_before(&self, timestamp: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "DELETE FROM processed_notifications WHERE processed = TRUE AND received_at < $1",
        )
        .bind(timestamp.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("purge processed notifications", e))?;

        Ok(result.rows_affected())
    }
}
