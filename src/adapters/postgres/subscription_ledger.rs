//! PostgreSQL implementation of SubscriptionLedger.
//!
//! `commit` runs in one transaction: lock the subscription row, apply the
//! patch, insert or refund the payment, then mark the claimed notification
//! processed. Any early return drops the transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::billing::{
    LedgerCommit, LedgerEffect, NewPayment, Payment, PaymentStatus, Subscription,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{CommitResult, NotificationOutcome, SubscriptionLedger};

use super::codec::{
    parse_payment_status, parse_payment_type, parse_recurring_status, parse_subscription_status,
    payment_status_str, payment_type_str, recurring_status_str, subscription_status_str,
};

pub struct PostgresSubscriptionLedger {
    pool: PgPool,
}

impl PostgresSubscriptionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    purchase_token: String,
    status: String,
    recurring_status: String,
    end_date: DateTime<Utc>,
    auto_renew: bool,
    grace_period_end: Option<DateTime<Utc>>,
    next_billing_date: Option<DateTime<Utc>>,
    failed_attempts: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            purchase_token: row.purchase_token,
            status: parse_subscription_status(&row.status)?,
            recurring_status: parse_recurring_status(&row.recurring_status)?,
            end_date: Timestamp::from_datetime(row.end_date),
            auto_renew: row.auto_renew,
            grace_period_end: row.grace_period_end.map(Timestamp::from_datetime),
            next_billing_date: row.next_billing_date.map(Timestamp::from_datetime),
            failed_attempts: row.failed_attempts.max(0) as u32,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    user_id: Uuid,
    plan_id: Uuid,
    subscription_id: Option<Uuid>,
    store_transaction_id: String,
    provider_order_id: Option<String>,
    status: String,
    amount_cents: i64,
    payment_type: String,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            plan_id: PlanId::from_uuid(row.plan_id),
            subscription_id: row.subscription_id.map(SubscriptionId::from_uuid),
            store_transaction_id: row.store_transaction_id,
            provider_order_id: row.provider_order_id,
            status: parse_payment_status(&row.status)?,
            amount_cents: row.amount_cents,
            payment_type: parse_payment_type(&row.payment_type)?,
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
        })
    }
}

const SUBSCRIPTION_COLUMNS: &str = r#"
    SELECT id, user_id, plan_id, purchase_token, status, recurring_status, end_date,
           auto_renew, grace_period_end, next_billing_date, failed_attempts,
           created_at, updated_at
    FROM subscriptions
"#;

const PAYMENT_COLUMNS: &str = r#"
    SELECT id, user_id, plan_id, subscription_id, store_transaction_id, provider_order_id,
           status, amount_cents, payment_type, created_at, paid_at, refunded_at
    FROM payments
"#;

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

impl PostgresSubscriptionLedger {
    /// Locks the subscription row, applies the patch and writes it back.
    async fn apply_patch(
        tx: &mut Transaction<'_, Postgres>,
        commit: &LedgerCommit,
    ) -> Result<(), DomainError> {
        let Some(patch) = &commit.patch else {
            return Ok(());
        };
        let id = commit.subscription_id.ok_or_else(|| {
            DomainError::new(ErrorCode::InternalError, "patch without subscription id")
        })?;

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "{} WHERE id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("lock subscription", e))?;

        let mut subscription = match row {
            Some(row) => Subscription::try_from(row)?,
            None => {
                return Err(DomainError::new(
                    ErrorCode::SubscriptionNotFound,
                    format!("Subscription not found: {}", id),
                ))
            }
        };
        patch.apply_to(&mut subscription, commit.now);

        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $2, recurring_status = $3, end_date = $4, auto_renew = $5,
                grace_period_end = $6, next_billing_date = $7, failed_attempts = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription_status_str(subscription.status))
        .bind(recurring_status_str(subscription.recurring_status))
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.auto_renew)
        .bind(subscription.grace_period_end.map(|t| *t.as_datetime()))
        .bind(subscription.next_billing_date.map(|t| *t.as_datetime()))
        .bind(subscription.failed_attempts.min(i32::MAX as u32) as i32)
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("update subscription", e))?;

        Ok(())
    }

    /// Inserts the payment unless one already exists for its transaction
    /// and order. Returns false on conflict.
    ///
    /// The lookup covers rows with a NULL order id, which the unique index
    /// treats as `''`. Concurrent inserts of the same payment are serialized
    /// by `ON CONFLICT DO NOTHING` against `uq_payments_transaction_order`:
    /// the loser affects zero rows and reports a conflict.
    async fn insert_payment(
        tx: &mut Transaction<'_, Postgres>,
        new_payment: &NewPayment,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let existing: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM payments
            WHERE store_transaction_id = $1
              AND provider_order_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(&new_payment.store_transaction_id)
        .bind(new_payment.provider_order_id.as_deref())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| db_error("check payment uniqueness", e))?;

        if existing.is_some() {
            return Ok(false);
        }

        let payment = new_payment.clone().into_payment(now);
        let result = sqlx::query(
            r#"
            INSERT INTO payments (
                id, user_id, plan_id, subscription_id, store_transaction_id,
                provider_order_id, status, amount_cents, payment_type,
                created_at, paid_at, refunded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NULL)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.user_id.as_uuid())
        .bind(payment.plan_id.as_uuid())
        .bind(payment.subscription_id.map(|id| *id.as_uuid()))
        .bind(&payment.store_transaction_id)
        .bind(payment.provider_order_id.as_deref())
        .bind(payment_status_str(payment.status))
        .bind(payment.amount_cents)
        .bind(payment_type_str(payment.payment_type))
        .bind(payment.created_at.as_datetime())
        .bind(payment.paid_at.map(|t| *t.as_datetime()))
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("insert payment", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Marks the claimed notification processed as `applied`.
    async fn mark_notification_processed(
        tx: &mut Transaction<'_, Postgres>,
        notification_id: &str,
        processed_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE processed_notifications
            SET processed = TRUE, outcome = $2, detail = NULL,
                claimed_at = NULL, processed_at = $3
            WHERE notification_id = $1
            "#,
        )
        .bind(notification_id)
        .bind(NotificationOutcome::Applied.as_str())
        .bind(processed_at.as_datetime())
        .execute(&mut **tx)
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

    /// Marks the payment refunded. Returns false if it already was.
    async fn refund_payment(
        tx: &mut Transaction<'_, Postgres>,
        payment_id: PaymentId,
        refunded_at: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, refunded_at = $3
            WHERE id = $1 AND status <> $2
            "#,
        )
        .bind(payment_id.as_uuid())
        .bind(payment_status_str(PaymentStatus::Refunded))
        .bind(refunded_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("refund payment", e))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM payments WHERE id = $1")
            .bind(payment_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("find payment", e))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("Payment not found: {}", payment_id),
            )),
        }
    }
}

#[async_trait]
impl SubscriptionLedger for PostgresSubscriptionLedger {
    async fn find_subscription_by_token(
        &self,
        purchase_token: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("{} WHERE purchase_token = $1", SUBSCRIPTION_COLUMNS))
                .bind(purchase_token)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_payment(
        &self,
        store_transaction_id: &str,
        provider_order_id: Option<&str>,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE store_transaction_id = $1 AND provider_order_id IS NOT DISTINCT FROM $2",
            PAYMENT_COLUMNS
        ))
        .bind(store_transaction_id)
        .bind(provider_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn find_latest_payment(
        &self,
        store_transaction_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "{} WHERE store_transaction_id = $1 ORDER BY created_at DESC LIMIT 1",
            PAYMENT_COLUMNS
        ))
        .bind(store_transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find latest payment", e))?;

        row.map(Payment::try_from).transpose()
    }

    async fn commit(&self, commit: &LedgerCommit) -> Result<CommitResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        Self::apply_patch(&mut tx, commit).await?;

        let applied = match &commit.effect {
            LedgerEffect::None => true,
            LedgerEffect::InsertPayment(new_payment) => {
                Self::insert_payment(&mut tx, new_payment, commit.now).await?
            }
            LedgerEffect::Refund {
                payment_id,
                refunded_at,
            } => Self::refund_payment(&mut tx, *payment_id, *refunded_at).await?,
        };

        if !applied {
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back transaction", e))?;
            return Ok(CommitResult::AlreadyApplied);
        }

        if let Some(notification_id) = commit.notification_id.as_deref() {
            Self::mark_notification_processed(&mut tx, notification_id, commit.now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit transaction", e))?;
        Ok(CommitResult::Committed)
    }
}
