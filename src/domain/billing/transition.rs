//! Pure subscription state machine.
//!
//! `transition` maps (current subscription, event, provider snapshot,
//! payment history) to the patch and ledger effect the ledger writer must
//! apply. It performs no I/O and reads no clock; `now` is an input.
//!
//! Every value written comes from the freshly fetched snapshot, never from
//! the event, so replaying or reordering notifications converges on the
//! provider's view.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{PaymentId, StateMachine, SubscriptionId, Timestamp};

use super::{
    AttemptsChange, NewPayment, Payment, PaymentStatus, PaymentType,
    ProviderSubscriptionSnapshot, RecurringStatus, RenewalEvent, RenewalEventKind, Subscription,
    SubscriptionPatch, SubscriptionStatus,
};

/// Payments relevant to one notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentHistory {
    /// Row for `(purchase_token, snapshot.latest_order_id)`, if recorded.
    pub for_order: Option<Payment>,

    /// Most recent row for the purchase token (or its linked token).
    pub latest: Option<Payment>,
}

/// Ledger-side consequence of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEffect {
    None,
    InsertPayment(NewPayment),
    Refund {
        payment_id: PaymentId,
        refunded_at: Timestamp,
    },
}

/// How the notification was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Patch and/or ledger effect should be committed.
    Applied,

    /// Nothing to change; the reason is logged.
    NoOp(String),

    /// Business inconsistency; recorded durably and acknowledged.
    Anomaly(String),

    /// The effect is already present in the ledger.
    AlreadyApplied,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Applied => "applied",
            Disposition::NoOp(_) => "no_op",
            Disposition::Anomaly(_) => "anomaly",
            Disposition::AlreadyApplied => "already_applied",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Disposition::NoOp(reason) | Disposition::Anomaly(reason) => Some(reason),
            Disposition::Applied | Disposition::AlreadyApplied => None,
        }
    }
}

/// Output of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub patch: Option<SubscriptionPatch>,
    pub ledger: LedgerEffect,
    pub disposition: Disposition,

    /// Non-fatal observations the caller should log.
    pub warnings: Vec<String>,
}

impl Transition {
    fn applied(patch: Option<SubscriptionPatch>, ledger: LedgerEffect) -> Self {
        Self {
            patch,
            ledger,
            disposition: Disposition::Applied,
            warnings: Vec::new(),
        }
    }

    fn no_op(reason: impl Into<String>) -> Self {
        Self {
            patch: None,
            ledger: LedgerEffect::None,
            disposition: Disposition::NoOp(reason.into()),
            warnings: Vec::new(),
        }
    }

    fn anomaly(reason: impl Into<String>) -> Self {
        Self {
            patch: None,
            ledger: LedgerEffect::None,
            disposition: Disposition::Anomaly(reason.into()),
            warnings: Vec::new(),
        }
    }

    fn already_applied() -> Self {
        Self {
            patch: None,
            ledger: LedgerEffect::None,
            disposition: Disposition::AlreadyApplied,
            warnings: Vec::new(),
        }
    }

    /// True if there is something for the ledger writer to commit.
    pub fn has_effect(&self) -> bool {
        self.patch.is_some() || self.ledger != LedgerEffect::None
    }

    /// Packages the transition for the ledger writer.
    pub fn into_commit(
        self,
        subscription_id: Option<SubscriptionId>,
        notification_id: Option<String>,
        now: Timestamp,
    ) -> LedgerCommit {
        LedgerCommit {
            subscription_id,
            notification_id,
            patch: self.patch,
            effect: self.ledger,
            now,
        }
    }
}

/// A unit of work for the ledger writer: everything commits or nothing does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerCommit {
    pub subscription_id: Option<SubscriptionId>,

    /// Claimed notification to mark processed (`applied`) in the same unit.
    pub notification_id: Option<String>,

    pub patch: Option<SubscriptionPatch>,
    pub effect: LedgerEffect,
    pub now: Timestamp,
}

/// Computes the reconciliation for one notification.
pub fn transition(
    current: Option<&Subscription>,
    event: &RenewalEvent,
    snapshot: &ProviderSubscriptionSnapshot,
    payments: &PaymentHistory,
    now: Timestamp,
) -> Transition {
    use RenewalEventKind::*;

    match event.kind {
        Purchased => return Transition::no_op("initial purchase is recorded by the checkout path"),
        PendingPurchaseCanceled => return Transition::no_op("pending purchase was canceled"),
        Revoked => return revoke(current, snapshot, payments, now),
        _ => {}
    }

    let Some(subscription) = current else {
        return Transition::anomaly(format!(
            "no local subscription for purchase token on {}",
            event.kind
        ));
    };

    let expiry = snapshot.expiry_time;
    let result = match event.kind {
        Renewed => return renew(subscription, event, snapshot, payments, now),
        Recovered => Transition::applied(
            Some(SubscriptionPatch {
                status: Some(SubscriptionStatus::Active),
                recurring_status: Some(RecurringStatus::Active),
                failed_attempts: Some(AttemptsChange::Reset),
                grace_period_end: Some(None),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        Cancelled => {
            if snapshot.is_active_and_renewing_at(now) {
                return Transition::no_op("stale cancellation: provider reports auto-renew enabled");
            }
            Transition::applied(
                Some(SubscriptionPatch {
                    auto_renew: Some(false),
                    recurring_status: Some(RecurringStatus::Cancelled),
                    next_billing_date: Some(None),
                    ..Default::default()
                }),
                LedgerEffect::None,
            )
        }
        OnHold => Transition::applied(
            Some(SubscriptionPatch {
                status: Some(SubscriptionStatus::Active),
                recurring_status: Some(RecurringStatus::PendingPayment),
                failed_attempts: Some(AttemptsChange::Increment),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        InGracePeriod => Transition::applied(
            Some(SubscriptionPatch {
                status: Some(SubscriptionStatus::Active),
                recurring_status: Some(RecurringStatus::PendingPayment),
                grace_period_end: Some(Some(expiry)),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        Restarted => Transition::applied(
            Some(SubscriptionPatch {
                status: Some(SubscriptionStatus::Active),
                recurring_status: Some(RecurringStatus::Active),
                end_date: Some(expiry),
                auto_renew: Some(snapshot.auto_renewing),
                failed_attempts: Some(AttemptsChange::Reset),
                grace_period_end: Some(None),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        Paused => Transition::applied(
            Some(SubscriptionPatch {
                recurring_status: Some(RecurringStatus::Paused),
                auto_renew: Some(false),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        PriceChangeConfirmed => Transition::no_op("price change confirmed"),
        Deferred => Transition::applied(
            Some(SubscriptionPatch {
                end_date: Some(expiry),
                next_billing_date: Some(Some(expiry)),
                ..Default::default()
            }),
            LedgerEffect::None,
        ),
        PauseScheduleChanged => Transition::no_op("pause schedule changed"),
        Expired => {
            if snapshot.is_entitled_at(now) {
                return Transition::no_op("stale expiry: provider reports an unexpired subscription");
            }
            Transition::applied(
                Some(SubscriptionPatch {
                    status: Some(SubscriptionStatus::Expired),
                    recurring_status: Some(RecurringStatus::Inactive),
                    auto_renew: Some(false),
                    next_billing_date: Some(None),
                    ..Default::default()
                }),
                LedgerEffect::None,
            )
        }
        Purchased | PendingPurchaseCanceled | Revoked => Transition::no_op("handled above"),
    };

    with_graph_check(result, subscription)
}

fn renew(
    subscription: &Subscription,
    event: &RenewalEvent,
    snapshot: &ProviderSubscriptionSnapshot,
    payments: &PaymentHistory,
    now: Timestamp,
) -> Transition {
    if payments.for_order.is_some() {
        return Transition::already_applied();
    }

    let expiry = snapshot.expiry_time;
    let patch = SubscriptionPatch {
        status: Some(SubscriptionStatus::Active),
        recurring_status: Some(RecurringStatus::Active),
        end_date: Some(expiry),
        failed_attempts: Some(AttemptsChange::Reset),
        next_billing_date: Some(Some(expiry)),
        ..Default::default()
    };

    let mut warnings = Vec::new();
    let amount_cents = match &payments.latest {
        Some(previous) => previous.amount_cents,
        None => {
            warnings.push("no prior payment to price renewal; recording zero amount".to_string());
            0
        }
    };

    let payment = NewPayment {
        user_id: subscription.user_id,
        plan_id: subscription.plan_id,
        subscription_id: Some(subscription.id),
        store_transaction_id: event.purchase_token.clone(),
        provider_order_id: snapshot.latest_order_id.clone(),
        amount_cents,
        payment_type: PaymentType::Recurring,
        paid_at: now,
    };

    let mut result = with_graph_check(
        Transition::applied(Some(patch), LedgerEffect::InsertPayment(payment)),
        subscription,
    );
    result.warnings.extend(warnings);
    result
}

fn revoke(
    current: Option<&Subscription>,
    snapshot: &ProviderSubscriptionSnapshot,
    payments: &PaymentHistory,
    now: Timestamp,
) -> Transition {
    let Some(payment) = payments.for_order.as_ref().or(payments.latest.as_ref()) else {
        return Transition::anomaly(format!(
            "no payment to refund for order {}",
            snapshot.latest_order_id.as_deref().unwrap_or("<none>")
        ));
    };

    let already_refunded = payment.status == PaymentStatus::Refunded;
    let patch = SubscriptionPatch {
        status: Some(SubscriptionStatus::Cancelled),
        recurring_status: Some(RecurringStatus::Cancelled),
        auto_renew: Some(false),
        ..Default::default()
    };

    let subscription_settled = current.map_or(true, |s| {
        s.status == SubscriptionStatus::Cancelled
            && s.recurring_status == RecurringStatus::Cancelled
            && !s.auto_renew
    });
    if already_refunded && subscription_settled {
        return Transition::already_applied();
    }

    let ledger = if already_refunded {
        LedgerEffect::None
    } else {
        LedgerEffect::Refund {
            payment_id: payment.id,
            refunded_at: now,
        }
    };

    match current {
        Some(subscription) => with_graph_check(Transition::applied(Some(patch), ledger), subscription),
        None => {
            let mut result = Transition::applied(None, ledger);
            result
                .warnings
                .push("refunding payment with no linked local subscription".to_string());
            result
        }
    }
}

/// Flags recurring-status moves outside the documented graph.
///
/// The snapshot is ground truth, so the move is still applied.
fn with_graph_check(mut result: Transition, subscription: &Subscription) -> Transition {
    if let Some(target) = result.patch.as_ref().and_then(|p| p.recurring_status) {
        if !subscription.recurring_status.can_transition_to(&target) {
            result.warnings.push(format!(
                "recurring status moved outside documented graph: {:?} -> {:?}",
                subscription.recurring_status, target
            ));
        }
    }
    result
}
