//! Pocket Tracker: a personal expense-tracking service.
//!
//! Users sign up, record income/expense transactions against a shared
//! category set, put monthly limits on categories, and read back monthly
//! summaries plus derived insights over a JSON API.

pub mod auth;
pub mod backend;
pub mod database;
pub mod error;
pub mod insights;
