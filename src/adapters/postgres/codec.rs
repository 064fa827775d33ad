//! Text encodings for enum columns.

use crate::domain::billing::{PaymentStatus, PaymentType, RecurringStatus, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode};

fn invalid(column: &str, value: &str) -> DomainError {
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Invalid {} value: {}", column, value),
    )
}

pub(super) fn subscription_status_str(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "ACTIVE",
        SubscriptionStatus::Expired => "EXPIRED",
        SubscriptionStatus::Cancelled => "CANCELLED",
    }
}

pub(super) fn parse_subscription_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "ACTIVE" => Ok(SubscriptionStatus::Active),
        "EXPIRED" => Ok(SubscriptionStatus::Expired),
        "CANCELLED" => Ok(SubscriptionStatus::Cancelled),
        _ => Err(invalid("status", s)),
    }
}

pub(super) fn recurring_status_str(status: RecurringStatus) -> &'static str {
    match status {
        RecurringStatus::Active => "ACTIVE",
        RecurringStatus::PendingPayment => "PENDING_PAYMENT",
        RecurringStatus::Paused => "PAUSED",
        RecurringStatus::Cancelled => "CANCELLED",
        RecurringStatus::Inactive => "INACTIVE",
    }
}

pub(super) fn parse_recurring_status(s: &str) -> Result<RecurringStatus, DomainError> {
    match s {
        "ACTIVE" => Ok(RecurringStatus::Active),
        "PENDING_PAYMENT" => Ok(RecurringStatus::PendingPayment),
        "PAUSED" => Ok(RecurringStatus::Paused),
        "CANCELLED" => Ok(RecurringStatus::Cancelled),
        "INACTIVE" => Ok(RecurringStatus::Inactive),
        _ => Err(invalid("recurring_status", s)),
    }
}

pub(super) fn payment_status_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Paid => "PAID",
        PaymentStatus::Failed => "FAILED",
        PaymentStatus::Cancelled => "CANCELLED",
        PaymentStatus::Refunded => "REFUNDED",
    }
}

pub(super) fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "PAID" => Ok(PaymentStatus::Paid),
        "FAILED" => Ok(PaymentStatus::Failed),
        "CANCELLED" => Ok(PaymentStatus::Cancelled),
        "REFUNDED" => Ok(PaymentStatus::Refunded),
        _ => Err(invalid("payment status", s)),
    }
}

pub(super) fn payment_type_str(payment_type: PaymentType) -> &'static str {
    match payment_type {
        PaymentType::InitialSubscription => "INITIAL_SUBSCRIPTION",
        PaymentType::Recurring => "RECURRING",
        PaymentType::OneTime => "ONE_TIME",
    }
}

pub(super) fn parse_payment_type(s: &str) -> Result<PaymentType, DomainError> {
    match s {
        "INITIAL_SUBSCRIPTION" => Ok(PaymentType::InitialSubscription),
        "RECURRING" => Ok(PaymentType::Recurring),
        "ONE_TIME" => Ok(PaymentType::OneTime),
        _ => Err(invalid("payment_type", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recurring_status_round_trips_every_variant() {
        for status in [
            RecurringStatus::Active,
            RecurringStatus::PendingPayment,
            RecurringStatus::Paused,
            RecurringStatus::Cancelled,
            RecurringStatus::Inactive,
        ] {
            assert_eq!(parse_recurring_status(recurring_status_str(status)).unwrap(), status);
        }
    }

    #[test]
    fn encodings_match_serde_names() {
        let json = serde_json::to_string(&RecurringStatus::PendingPayment).unwrap();
        assert_eq!(json, format!("\"{}\"", recurring_status_str(RecurringStatus::PendingPayment)));
        let json = serde_json::to_string(&PaymentType::InitialSubscription).unwrap();
        assert_eq!(json, format!("\"{}\"", payment_type_str(PaymentType::InitialSubscription)));
    }

    #[test]
    fn unknown_values_are_database_errors() {
        assert_eq!(parse_subscription_status("active").unwrap_err().code, ErrorCode::DatabaseError);
        assert!(parse_payment_status("SETTLED").is_err());
    }
}
