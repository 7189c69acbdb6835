//! Shared types for keyforge
//!
//! Billing row types, the unified error system and small utilities used by
//! the webhook service and its tests.

pub mod error;
pub mod models;
pub mod util;
