//! Invoice payment events: summary audit record, `past_due` on failure

use serde::Serialize;
use serde_json::json;
use shared::models::{SubscriptionStatus, WebhookEventCreate};

use super::{EventOutcome, WebhookProcessor};
use crate::error::WebhookError;
use crate::stripe::Invoice;

pub const SUMMARY_EVENT_TYPE: &str = "invoice.summary";
pub const SUMMARY_CATEGORY: &str = "invoice_summary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Succeeded,
    Failed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Summary record written alongside the raw event
pub(super) fn invoice_summary(
    event_id: &str,
    invoice: &Invoice,
    status: InvoiceStatus,
) -> WebhookEventCreate {
    let amount = match status {
        InvoiceStatus::Succeeded => invoice.amount_paid,
        InvoiceStatus::Failed => invoice.amount_due,
    };
    WebhookEventCreate {
        event_type: SUMMARY_EVENT_TYPE.to_string(),
        category: SUMMARY_CATEGORY.to_string(),
        external_event_id: format!("{event_id}:summary"),
        payload: json!({
            "invoice_id": invoice.id,
            "subscription_id": invoice.subscription_id(),
            "customer_email": invoice.customer_email(),
            "amount": amount,
            "currency": invoice.currency,
            "status": status.as_str(),
        }),
    }
}

impl WebhookProcessor {
    pub(super) async fn invoice_paid(
        &self,
        event_id: &str,
        invoice: &Invoice,
        status: InvoiceStatus,
    ) -> Result<EventOutcome, WebhookError> {
        let summary = invoice_summary(event_id, invoice, status);
        if !self.store.record_event(&summary).await? {
            tracing::debug!(event_id = %event_id, "Invoice summary already recorded");
        }

        let subscription_id = invoice.subscription_id().map(str::to_string);
        let mut past_due_applied = false;
        if status == InvoiceStatus::Failed {
            match &subscription_id {
                Some(id) => {
                    past_due_applied = self
                        .store
                        .set_subscription_status(id, SubscriptionStatus::PastDue)
                        .await?
                        .is_some();
                    if !past_due_applied {
                        tracing::warn!(subscription_id = %id, "Payment failed for unknown subscription");
                    }
                }
                None => {
                    tracing::warn!(invoice_id = %invoice.id, "Failed invoice without subscription");
                }
            }
        }

        tracing::info!(
            invoice_id = %invoice.id,
            subscription_id = ?subscription_id,
            status = status.as_str(),
            "Invoice payment recorded"
        );

        Ok(EventOutcome::InvoiceRecorded {
            invoice_id: invoice.id.clone(),
            subscription_id,
            status,
            past_due_applied,
        })
    }
}
