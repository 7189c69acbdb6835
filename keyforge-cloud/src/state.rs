//! Application state for keyforge-cloud

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::db::PgBillingStore;
use crate::stripe::StripeClient;
use crate::webhook::{PriceCatalog, WebhookProcessor};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<WebhookProcessor>,
    /// Stripe webhook signing secret
    pub webhook_secret: Arc<str>,
    pub tolerance_secs: i64,
}

impl AppState {
    pub fn new(
        processor: Arc<WebhookProcessor>,
        webhook_secret: impl Into<Arc<str>>,
        tolerance_secs: i64,
    ) -> Self {
        Self {
            processor,
            webhook_secret: webhook_secret.into(),
            tolerance_secs,
        }
    }

    /// Connect the database, run migrations and wire the Stripe client
    pub async fn from_config(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        let stripe = StripeClient::new(
            config.stripe_secret_key.clone(),
            config.stripe_api_base.clone(),
            config.stripe_timeout,
        )?;

        let catalog = PriceCatalog::builtin().with_overrides(config.price_product_map.clone());
        tracing::info!(prices = catalog.len(), "Price catalog loaded");

        let processor = WebhookProcessor::new(
            Arc::new(PgBillingStore::new(pool)),
            Arc::new(stripe),
            catalog,
        );

        Ok(Self::new(
            Arc::new(processor),
            config.stripe_webhook_secret.as_str(),
            config.webhook_tolerance_secs,
        ))
    }
}
