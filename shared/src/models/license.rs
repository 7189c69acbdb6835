//! License Model

use serde::{Deserialize, Serialize};

/// License entity, one per (user, product)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct License {
    pub id: i64,
    pub user_id: String,
    pub product_name: String,
    pub license_key: String,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create license payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseCreate {
    pub user_id: String,
    pub product_name: String,
    pub license_key: String,
}
