//! Stripe integration via REST API (no SDK dependency)
//!
//! [`PaymentProvider`] is the seam the webhook processor consumes;
//! [`StripeClient`] implements it over reqwest.

pub mod event;
pub mod signature;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use event::{EventEnvelope, PaymentEvent};
pub use types::{CheckoutSession, Customer, Invoice, LineItem, Metadata, StripeSubscription};

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Stripe API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Payment processor operations used by the webhook path
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch the authoritative subscription object
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError>;

    /// Merge `entries` into the subscription's metadata
    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        entries: &[(&str, &str)],
    ) -> Result<(), StripeError>;

    /// Line items of a checkout session
    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError>;

    async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, StripeError>;
}

/// Stripe REST client
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StripeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.api_base)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, StripeError> {
        let resp = self
            .http
            .get(self.url(path))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await?;
        parse_response(resp).await
    }
}

/// Decode a Stripe response, turning non-2xx into [`StripeError::Api`]
async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, StripeError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or("unknown error")
        .to_string();
    Err(StripeError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, StripeError> {
        self.get(&format!("subscriptions/{subscription_id}")).await
    }

    async fn update_subscription_metadata(
        &self,
        subscription_id: &str,
        entries: &[(&str, &str)],
    ) -> Result<(), StripeError> {
        let form: Vec<(String, &str)> = entries
            .iter()
            .map(|(k, v)| (format!("metadata[{k}]"), *v))
            .collect();
        let resp = self
            .http
            .post(self.url(&format!("subscriptions/{subscription_id}")))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        let _: serde_json::Value = parse_response(resp).await?;
        Ok(())
    }

    async fn list_line_items(&self, session_id: &str) -> Result<Vec<LineItem>, StripeError> {
        let list: types::List<LineItem> = self
            .get(&format!("checkout/sessions/{session_id}/line_items?limit=100"))
            .await?;
        Ok(list.data)
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, StripeError> {
        self.get(&format!("customers/{customer_id}")).await
    }
}
