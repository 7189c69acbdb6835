//! Payment webhook handler
//!
//! POST /payments-webhook: Stripe events (raw body for signature verification)

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{AppError, ErrorCode};

use crate::state::AppState;
use crate::stripe::EventEnvelope;
use crate::stripe::signature::{SIGNATURE_HEADER, SignatureError, verify_webhook_signature};
use crate::webhook::EventOutcome;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub event_type: String,
    pub duplicate: bool,
    pub result: EventOutcome,
}

/// Handle an incoming payment-processor event
///
/// Must receive raw body (not JSON) for HMAC signature verification.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let sig_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Stripe-Signature header");
            AppError::new(ErrorCode::SignatureMissing)
        })?;

    verify_webhook_signature(&body, sig_header, &state.webhook_secret, state.tolerance_secs)
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            signature_error(e)
        })?;

    let payload: Value = serde_json::from_slice(&body).map_err(invalid_event)?;
    let envelope = EventEnvelope::deserialize(&payload).map_err(invalid_event)?;

    tracing::info!(
        event_id = %envelope.id,
        event_type = %envelope.event_type,
        livemode = envelope.livemode,
        "Received payment webhook"
    );

    let processed = state.processor.process(&envelope, payload).await.map_err(|e| {
        tracing::warn!(
            event_id = %envelope.id,
            event_type = %envelope.event_type,
            error = %e,
            "Webhook processing failed"
        );
        AppError::from(e)
    })?;

    Ok(Json(WebhookAck {
        received: true,
        event_type: processed.event_type,
        duplicate: processed.duplicate,
        result: processed.outcome,
    }))
}

fn invalid_event(e: serde_json::Error) -> AppError {
    tracing::warn!(error = %e, "Failed to parse webhook JSON");
    AppError::invalid_format("Webhook body is not a valid event").with_detail("reason", e.to_string())
}

fn signature_error(e: SignatureError) -> AppError {
    match e {
        SignatureError::TimestampOutsideTolerance => AppError::new(ErrorCode::SignatureExpired),
        other => AppError::with_message(ErrorCode::SignatureInvalid, other.to_string()),
    }
}
