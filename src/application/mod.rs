//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers own sequencing, timeouts and logging; the state machine itself
//! lives in the domain.

pub mod handlers;

pub use handlers::{
    NotificationSweeper, NotificationSweeperConfig, ReconcileNotificationCommand,
    ReconcileNotificationHandler, ReconcileNotificationResult, ReconcileSettings, SweepReport,
};
