//! User Model
//!
//! Users are owned by the authentication backend; the webhook path only
//! looks them up and clears the denormalized subscription reference.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    /// Processor subscription id of the user's current subscription
    pub subscription_id: Option<String>,
}
