//! keyforge-cloud: payment webhook reconciliation for license sales
//!
//! Receives signed Stripe events, keeps the `subscriptions` table in step
//! with the processor and provisions one license per (user, product) on
//! completed checkouts.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod stripe;
pub mod webhook;

pub use config::Config;
pub use state::AppState;
