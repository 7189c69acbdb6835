//! Shared fixtures: scripted Stripe provider, signed requests, router

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use keyforge_cloud::AppState;
use keyforge_cloud::api::create_router;
use keyforge_cloud::db::MemoryStore;
use keyforge_cloud::stripe::{Customer, LineItem, PaymentProvider, StripeError, StripeSubscription};
use keyforge_cloud::webhook::{PriceCatalog, WebhookProcessor};

pub const WEBHOOK_SECRET: &str = "whsec_test_keyforge";
pub const AUTOVOTER_PRICE: &str = "price_1R1A9uGLqZ8YjU1vEkXXC79n";

/// In-memory stand-in for the Stripe API
#[derive(Default)]
pub struct ScriptedStripe {
    subscriptions: Mutex<HashMap<String, StripeSubscription>>,
    customers: Mutex<HashMap<String, Customer>>,
    line_items: Mutex<HashMap<String, Vec<LineItem>>>,
    metadata_updates: Mutex<Vec<(String, String, String)>>,
    line_item_calls: AtomicUsize,
    fail_metadata_updates: AtomicBool,
}

impl ScriptedStripe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, subscription: Value) -> Self {
        let sub: StripeSubscription =
            serde_json::from_value(subscription).expect("valid subscription fixture");
        self.subscriptions
            .lock()
            .unwrap()
            .insert(sub.id.clone(), sub);
        self
    }

    pub fn with_customer(self, id: &str, email: &str) -> Self {
        let customer: Customer =
            serde_json::from_value(json!({ "id": id, "email": email })).unwrap();
        self.customers
            .lock()
            .unwrap()
            .insert(id.to_string(), customer);
        self
    }

    pub fn with_line_items(self, session_id: &str, items: Value) -> Self {
        let items: Vec<LineItem> = serde_json::from_value(items).expect("valid line items");
        self.line_items
            .lock()
            .unwrap()
            .insert(session_id.to_string(), items);
        self
    }

    /// (subscription id, key, value) per metadata write, in call order
    pub fn metadata_updates(&self) -> Vec<(String, String, String)> {
        self.metadata_updates.lock().unwrap().clone()
    }

    pub fn line_item_calls(&self) -> usize {
        self.line_item_calls.load(Ordering::SeqCst)
    }

    /// Make every metadata write fail with a 500 from the API
    pub fn fail_metadata_updates(&self, fail: bool) {
        self.fail_metadata_updates.store(fail, Ordering::SeqCst);
    }
}

fn not_found(kind: &str, id: &str) -> StripeError {
    StripeError::Api {
        status: 404,
        message: format!("No such {kind}: '{id}'"),
    }
}

#[async_trait]
impl PaymentProvider for ScriptedStripe {
    async fn retrieve_subscription(&self, id: &str) -> Result<StripeSubscription, StripeError> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("subscription", id))
    }

    async fn update_subscription_metadata(
        &self,
        id: &str,
        entries: &[(&str, &str)],
    ) -> Result<(), StripeError> {
        if self.fail_metadata_updates.load(Ordering::SeqCst) {
            return Err(StripeError::Api {
                status: 500,
                message: "metadata update failed".to_string(),
            });
        }
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let sub = subscriptions
            .get_mut(id)
            .ok_or_else(|| not_found("subscription", id))?;
        let mut updates = self.metadata_updates.lock().unwrap();
        for (key, value) in entries {
            sub.metadata.insert(key.to_string(), value.to_string());
            updates.push((id.to_string(), key.to_string(), value.to_string()));
        }
        Ok(())
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        self.line_item_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .line_items
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer, StripeError> {
        self.customers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found("customer", id))
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub stripe: Arc<ScriptedStripe>,
    router: Router,
}

impl TestApp {
    pub fn new(store: MemoryStore, stripe: ScriptedStripe) -> Self {
        let store = Arc::new(store);
        let stripe = Arc::new(stripe);
        let processor = WebhookProcessor::new(store.clone(), stripe.clone(), PriceCatalog::builtin());
        let state = AppState::new(Arc::new(processor), WEBHOOK_SECRET, 300);
        Self {
            store,
            stripe,
            router: create_router(state),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    /// POST a correctly signed event
    pub async fn post_event(&self, event: &Value) -> (StatusCode, Value) {
        let body = serde_json::to_vec(event).unwrap();
        let header = signature_header(&body, WEBHOOK_SECRET, now());
        self.send(webhook_request(body, Some(&header))).await
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn compute_stripe_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    type HmacSha256 = Hmac<Sha256>;

    let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_stripe_signature(payload, secret, timestamp)
    )
}

pub fn webhook_request(body: Vec<u8>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/payments-webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn event(id: &str, event_type: &str, object: Value) -> Value {
    json!({
        "id": id,
        "object": "event",
        "type": event_type,
        "created": now(),
        "livemode": false,
        "data": { "object": object }
    })
}

pub fn subscription(id: &str, price: &str, metadata: Value) -> Value {
    json!({
        "id": id,
        "object": "subscription",
        "status": "active",
        "customer": "cus_1",
        "currency": "usd",
        "current_period_start": 1_760_000_000,
        "current_period_end": 1_762_592_000,
        "cancel_at_period_end": false,
        "metadata": metadata,
        "items": {
            "object": "list",
            "data": [{
                "id": "si_1",
                "quantity": 1,
                "price": {
                    "id": price,
                    "currency": "usd",
                    "unit_amount": 499,
                    "recurring": { "interval": "month" }
                }
            }],
            "has_more": false
        }
    })
}

pub fn checkout_session(id: &str, subscription_id: Option<&str>, metadata: Value) -> Value {
    json!({
        "id": id,
        "object": "checkout.session",
        "mode": "subscription",
        "subscription": subscription_id,
        "customer": "cus_1",
        "customer_details": { "email": "buyer@example.com" },
        "amount_total": 499,
        "currency": "usd",
        "metadata": metadata
    })
}
