//! Reconciliation handlers.
//!
//! - `ReconcileNotificationHandler` - Reconciles one pushed renewal notification
//! - `NotificationSweeper` - Replays abandoned notifications and purges old ones

mod notification_sweeper;
mod reconcile_notification;

pub use notification_sweeper::{NotificationSweeper, NotificationSweeperConfig, SweepReport};
pub use reconcile_notification::{
    ReconcileNotificationCommand, ReconcileNotificationHandler, ReconcileNotificationResult,
    ReconcileSettings,
};
