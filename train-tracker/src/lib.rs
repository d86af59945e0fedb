//! Real-time tracker for a single Trenord train.
//!
//! Polls the Trenord journey endpoint for one train, turns each response
//! into an immutable [`domain::Train`] snapshot with a derived status, and
//! only polls when the schedule says something can change.

pub mod config;
pub mod coordinator;
pub mod domain;
pub mod polling;
pub mod trenord;
