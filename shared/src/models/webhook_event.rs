//! Webhook Event Model (append-only audit log)

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit record of one received (or summarized) webhook event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WebhookEvent {
    pub id: i64,
    pub event_type: String,
    pub category: String,
    /// Processor event id, unique
    pub external_event_id: String,
    pub payload: Value,
    pub created_at: i64,
}

/// Insert payload for the audit log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventCreate {
    pub event_type: String,
    pub category: String,
    pub external_event_id: String,
    pub payload: Value,
}

impl WebhookEventCreate {
    /// Audit record for a received event; category is derived from the type
    pub fn received(event_type: &str, external_event_id: &str, payload: Value) -> Self {
        Self {
            event_type: event_type.to_string(),
            category: event_category(event_type).to_string(),
            external_event_id: external_event_id.to_string(),
            payload,
        }
    }
}

/// Coarse category of an event type: its first dot-separated segment
///
/// `invoice.payment_succeeded` → `invoice`
pub fn event_category(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}
