//! Command handlers.
//!
//! Each handler orchestrates ports to fulfil one use case.

pub mod reconciliation;

pub use reconciliation::{
    NotificationSweeper, NotificationSweeperConfig, ReconcileNotificationCommand,
    ReconcileNotificationHandler, ReconcileNotificationResult, ReconcileSettings, SweepReport,
};
