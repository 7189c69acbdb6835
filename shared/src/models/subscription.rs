//! Subscription Model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription status as reported by the payment processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl SubscriptionStatus {
    /// Database string representation
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trialing => "trialing",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Incomplete => "incomplete",
            Self::IncompleteExpired => "incomplete_expired",
            Self::Unpaid => "unpaid",
            Self::Paused => "paused",
        }
    }
}

/// Subscription entity, mirrored from the payment processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: i64,
    /// Processor subscription id (`sub_...`), unique
    pub external_subscription_id: String,
    pub user_id: Option<String>,
    pub price_id: Option<String>,
    pub currency: Option<String>,
    /// Billing interval (`month`, `year`); column `billing_interval`
    #[cfg_attr(feature = "db", sqlx(rename = "billing_interval"))]
    pub interval: Option<String>,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    /// Unit amount in the currency's minor unit
    pub amount: Option<i64>,
    pub customer_id: Option<String>,
    /// Free-form map; carries the derived `product_name`
    pub metadata: Value,
    pub canceled_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Subscription {
    /// String value from the metadata map
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn product_name(&self) -> Option<&str> {
        self.metadata_str("product_name")
    }
}

/// Field set written by an upsert (insert or full update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionUpsert {
    pub external_subscription_id: String,
    pub user_id: Option<String>,
    pub price_id: Option<String>,
    pub currency: Option<String>,
    pub interval: Option<String>,
    pub status: String,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: bool,
    pub amount: Option<i64>,
    pub customer_id: Option<String>,
    pub metadata: Value,
    pub canceled_at: Option<i64>,
    pub ended_at: Option<i64>,
}
