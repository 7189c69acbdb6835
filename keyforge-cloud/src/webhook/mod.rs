//! Webhook event processing
//!
//! [`WebhookProcessor::process`] takes a verified, parsed envelope through
//! audit → decode → dispatch. Every handler is idempotent: unique keys in
//! the store plus find-then-write make redelivery converge on one row per
//! subscription and one license per (user, product).

mod checkout;
mod invoice;
pub mod license_key;
pub mod product;
mod subscription;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use shared::models::WebhookEventCreate;

use crate::db::BillingStore;
use crate::error::WebhookError;
use crate::stripe::{EventEnvelope, PaymentEvent, PaymentProvider};

pub use checkout::CheckoutResult;
pub use invoice::InvoiceStatus;
pub use product::{PriceCatalog, ProductResolver, ProductSource};

/// What a handler did with an event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EventOutcome {
    SubscriptionUpserted {
        subscription_id: String,
        user_id: Option<String>,
        product_name: Option<String>,
        created: bool,
    },
    SubscriptionUpdated {
        subscription_id: String,
        updated: bool,
        status: Option<String>,
    },
    SubscriptionCanceled {
        subscription_id: String,
        found: bool,
        user_cleared: bool,
    },
    LicenseProvisioned(CheckoutResult),
    /// Checkout without subscription or payment intent
    CheckoutIgnored { session_id: String },
    InvoiceRecorded {
        invoice_id: String,
        subscription_id: Option<String>,
        status: InvoiceStatus,
        past_due_applied: bool,
    },
    Unhandled { event_type: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedEvent {
    pub event_id: String,
    pub event_type: String,
    /// The audit log already held this event id
    pub duplicate: bool,
    pub outcome: EventOutcome,
}

pub struct WebhookProcessor {
    store: Arc<dyn BillingStore>,
    payments: Arc<dyn PaymentProvider>,
    products: ProductResolver,
}

impl WebhookProcessor {
    pub fn new(
        store: Arc<dyn BillingStore>,
        payments: Arc<dyn PaymentProvider>,
        catalog: PriceCatalog,
    ) -> Self {
        let products = ProductResolver::new(catalog, payments.clone());
        Self::with_resolver(store, payments, products)
    }

    pub fn with_resolver(
        store: Arc<dyn BillingStore>,
        payments: Arc<dyn PaymentProvider>,
        products: ProductResolver,
    ) -> Self {
        Self {
            store,
            payments,
            products,
        }
    }

    /// Audit, decode and dispatch one verified event
    ///
    /// `payload` is the request body exactly as delivered; the audit row keeps
    /// it whole, including fields the envelope does not model.
    pub async fn process(
        &self,
        envelope: &EventEnvelope,
        payload: Value,
    ) -> Result<ProcessedEvent, WebhookError> {
        let duplicate = self.record_received(envelope, payload).await;

        let event =
            PaymentEvent::from_envelope(envelope).map_err(|source| WebhookError::Malformed {
                event_type: envelope.event_type.clone(),
                source,
            })?;

        let outcome = match event {
            PaymentEvent::SubscriptionCreated(sub) => self.subscription_created(&sub).await?,
            PaymentEvent::SubscriptionUpdated(sub) => self.subscription_updated(&sub).await?,
            PaymentEvent::SubscriptionDeleted(sub) => self.subscription_deleted(&sub).await?,
            PaymentEvent::CheckoutSessionCompleted(session) => {
                self.checkout_completed(&session).await?
            }
            PaymentEvent::InvoicePaymentSucceeded(invoice) => {
                self.invoice_paid(&envelope.id, &invoice, InvoiceStatus::Succeeded)
                    .await?
            }
            PaymentEvent::InvoicePaymentFailed(invoice) => {
                self.invoice_paid(&envelope.id, &invoice, InvoiceStatus::Failed)
                    .await?
            }
            PaymentEvent::Unrecognized { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event type");
                EventOutcome::Unhandled { event_type }
            }
        };

        Ok(ProcessedEvent {
            event_id: envelope.id.clone(),
            event_type: envelope.event_type.clone(),
            duplicate,
            outcome,
        })
    }

    /// Best-effort audit insert. Returns whether the event id was seen before.
    async fn record_received(&self, envelope: &EventEnvelope, payload: Value) -> bool {
        let record = WebhookEventCreate::received(&envelope.event_type, &envelope.id, payload);

        match self.store.record_event(&record).await {
            Ok(true) => false,
            Ok(false) => {
                tracing::info!(
                    event_id = %envelope.id,
                    event_type = %envelope.event_type,
                    "Duplicate webhook delivery, reprocessing"
                );
                true
            }
            Err(e) => {
                tracing::warn!(event_id = %envelope.id, error = %e, "Failed to record webhook event");
                false
            }
        }
    }
}
