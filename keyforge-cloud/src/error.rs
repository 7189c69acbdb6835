//! Webhook-processing error type
//!
//! `WebhookError` is what the processor returns; the `From` impl below
//! bridges it into the API-layer [`AppError`]. Infrastructure failures are
//! logged here so handlers can simply use `?`.

use shared::error::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::StoreError;
use crate::stripe::StripeError;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// A known event type whose object does not match its schema
    #[error("malformed {event_type} payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkout session {session_id} carries no user id")]
    MissingUser { session_id: String },

    #[error("could not resolve product for {context}")]
    ProductUnresolved { context: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Stripe(#[from] StripeError),
}

impl From<WebhookError> for AppError {
    fn from(e: WebhookError) -> Self {
        match e {
            WebhookError::Malformed { event_type, source } => {
                AppError::new(ErrorCode::InvalidFormat)
                    .with_detail("event_type", event_type)
                    .with_detail("reason", source.to_string())
            }
            WebhookError::MissingUser { session_id } => {
                tracing::warn!(session_id = %session_id, "Checkout session without user id");
                AppError::new(ErrorCode::UserUnresolved).with_detail("session_id", session_id)
            }
            WebhookError::ProductUnresolved { context } => {
                tracing::warn!(context = %context, "Product could not be resolved");
                AppError::new(ErrorCode::ProductUnresolved).with_detail("context", context)
            }
            WebhookError::Store(err) => {
                tracing::error!(error = %err, "Billing store error");
                AppError::with_message(ErrorCode::DatabaseError, "Billing store unavailable")
                    .with_detail("reason", err.to_string())
            }
            WebhookError::Stripe(err) => {
                tracing::error!(error = %err, "Payment provider error");
                AppError::with_message(ErrorCode::PaymentProviderError, "Payment provider request failed")
                    .with_detail("reason", err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn business_errors_are_client_errors() {
        let err: AppError = WebhookError::MissingUser {
            session_id: "cs_1".into(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::UserUnresolved);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);

        let err: AppError = WebhookError::ProductUnresolved {
            context: "cs_1".into(),
        }
        .into();
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn infrastructure_errors_are_server_errors() {
        let store = WebhookError::from(StoreError::Unavailable("subscriptions".into()));
        let err: AppError = store.into();
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);

        let stripe = WebhookError::from(StripeError::Api {
            status: 503,
            message: "down".into(),
        });
        let err: AppError = stripe.into();
        assert_eq!(err.code, ErrorCode::PaymentProviderError);
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn malformed_payload_is_bad_request() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = WebhookError::Malformed {
            event_type: "invoice.payment_failed".into(),
            source,
        };
        let err: AppError = err.into();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }
}
