//! Webhook event envelope and the typed event union

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{CheckoutSession, Invoice, StripeSubscription};

/// Raw event envelope as delivered by Stripe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: bool,
    pub data: EventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// Known event types, each with its typed payload
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    SubscriptionCreated(StripeSubscription),
    SubscriptionUpdated(StripeSubscription),
    SubscriptionDeleted(StripeSubscription),
    CheckoutSessionCompleted(CheckoutSession),
    InvoicePaymentSucceeded(Invoice),
    InvoicePaymentFailed(Invoice),
    /// Any other type; acknowledged without state change
    Unrecognized { event_type: String },
}

impl PaymentEvent {
    /// Decode the envelope's `data.object` according to its type
    pub fn from_envelope(envelope: &EventEnvelope) -> Result<Self, serde_json::Error> {
        let object = || envelope.data.object.clone();
        let event = match envelope.event_type.as_str() {
            "customer.subscription.created" | "subscription.created" => {
                Self::SubscriptionCreated(serde_json::from_value(object())?)
            }
            "customer.subscription.updated" | "subscription.updated" => {
                Self::SubscriptionUpdated(serde_json::from_value(object())?)
            }
            "customer.subscription.deleted" | "subscription.deleted" => {
                Self::SubscriptionDeleted(serde_json::from_value(object())?)
            }
            "checkout.session.completed" => {
                Self::CheckoutSessionCompleted(serde_json::from_value(object())?)
            }
            "invoice.payment_succeeded" => {
                Self::InvoicePaymentSucceeded(serde_json::from_value(object())?)
            }
            "invoice.payment_failed" => Self::InvoicePaymentFailed(serde_json::from_value(object())?),
            other => Self::Unrecognized {
                event_type: other.to_string(),
            },
        };
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(event_type: &str, object: Value) -> EventEnvelope {
        serde_json::from_value(json!({
            "id": "evt_1",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": object }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_known_types() {
        let ev = envelope(
            "customer.subscription.created",
            json!({ "id": "sub_1", "status": "active" }),
        );
        assert!(matches!(
            PaymentEvent::from_envelope(&ev).unwrap(),
            PaymentEvent::SubscriptionCreated(sub) if sub.id == "sub_1"
        ));

        let short = envelope("subscription.deleted", json!({ "id": "sub_1", "status": "canceled" }));
        assert!(matches!(
            PaymentEvent::from_envelope(&short).unwrap(),
            PaymentEvent::SubscriptionDeleted(_)
        ));

        let invoice = envelope("invoice.payment_failed", json!({ "id": "in_1", "amount_due": 500 }));
        assert!(matches!(
            PaymentEvent::from_envelope(&invoice).unwrap(),
            PaymentEvent::InvoicePaymentFailed(inv) if inv.amount_due == 500
        ));
    }

    #[test]
    fn unknown_types_are_unrecognized_not_errors() {
        let ev = envelope("charge.dispute.created", json!({ "anything": [1, 2, 3] }));
        assert_eq!(
            PaymentEvent::from_envelope(&ev).unwrap(),
            PaymentEvent::Unrecognized {
                event_type: "charge.dispute.created".to_string()
            }
        );
    }

    #[test]
    fn known_type_with_wrong_shape_is_an_error() {
        let ev = envelope("checkout.session.completed", json!({ "no_id": true }));
        assert!(PaymentEvent::from_envelope(&ev).is_err());
    }
}
