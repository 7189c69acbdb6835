//! API routes for keyforge-cloud

pub mod health;
pub mod payments_webhook;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use http::HeaderName;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Stripe event payloads stay well under this
const WEBHOOK_BODY_LIMIT: usize = 512 * 1024;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Create the service router
pub fn create_router(state: AppState) -> Router {
    // Payment webhook (signature-verified, raw body)
    let webhook = Router::new()
        .route(
            "/payments-webhook",
            post(payments_webhook::handle_webhook),
        )
        .layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .with_state(state)
}
