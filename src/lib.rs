//! Renewal Reconciler - Recurring-payment notification reconciliation
//!
//! Receives subscription lifecycle notifications pushed by a payment
//! provider, queries the provider for the authoritative subscription state
//! and applies the resulting change to the local subscription and payment
//! ledger exactly once.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
