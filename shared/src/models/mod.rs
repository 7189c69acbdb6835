//! Billing data models
//!
//! Row types for the webhook service's tables.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! Timestamps are Unix epoch milliseconds.

pub mod license;
pub mod subscription;
pub mod user;
pub mod webhook_event;

// Re-exports
pub use license::*;
pub use subscription::*;
pub use user::*;
pub use webhook_event::*;
