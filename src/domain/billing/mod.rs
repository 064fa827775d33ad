//! Billing domain module.
//!
//! Subscription lifecycle, payment ledger and renewal reconciliation rules.
//!
//! # Module Structure
//!
//! - `status` - SubscriptionStatus and RecurringStatus state machines
//! - `subscription` - Subscription entity and SubscriptionPatch
//! - `payment` - Payment ledger rows
//! - `renewal_event` - Provider-neutral notification model
//! - `snapshot` - Provider ground truth
//! - `transition` - Pure reconciliation state machine
//! - `webhook_authenticator` - Inbound request authentication
//! - `webhook_errors` - Error taxonomy and HTTP mapping

mod payment;
mod renewal_event;
mod snapshot;
mod status;
mod subscription;
mod transition;
mod webhook_authenticator;
mod webhook_errors;

pub use payment::{NewPayment, Payment, PaymentStatus, PaymentType};
pub use renewal_event::{RenewalEvent, RenewalEventKind};
pub use snapshot::{ProviderSubscriptionSnapshot, ProviderSubscriptionState};
pub use status::{RecurringStatus, SubscriptionStatus};
pub use subscription::{AttemptsChange, Subscription, SubscriptionPatch};
pub use transition::{
    transition, Disposition, LedgerCommit, LedgerEffect, PaymentHistory, Transition,
};
pub use webhook_authenticator::{AuthError, Credentials, WebhookAuthenticator};
pub use webhook_errors::{DecodeError, FetchError, WebhookError};
