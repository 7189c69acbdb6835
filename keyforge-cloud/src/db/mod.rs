//! Database access layer
//!
//! [`BillingStore`] is the data-access seam injected into the webhook
//! processor. [`PgBillingStore`] delegates to the per-table modules;
//! [`memory::MemoryStore`] backs tests and database-less local runs.

pub mod licenses;
pub mod memory;
pub mod subscriptions;
pub mod users;
pub mod webhook_events;

use async_trait::async_trait;
use shared::models::{
    License, LicenseCreate, Subscription, SubscriptionStatus, SubscriptionUpsert, User,
    WebhookEventCreate,
};
use sqlx::PgPool;
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique key already holds a row
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Map a sqlx error, surfacing unique violations as [`StoreError::Duplicate`]
    pub(crate) fn from_insert(err: sqlx::Error, what: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Duplicate(what.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Tables touched by the webhook path
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Append to the audit log. Returns `false` when `external_event_id`
    /// was already recorded.
    async fn record_event(&self, event: &WebhookEventCreate) -> StoreResult<bool>;

    async fn find_subscription(&self, external_id: &str) -> StoreResult<Option<Subscription>>;

    async fn insert_subscription(&self, sub: &SubscriptionUpsert) -> StoreResult<Subscription>;

    /// Overwrite every mutable field of the row keyed by
    /// `sub.external_subscription_id`; `None` when no such row exists
    async fn update_subscription(
        &self,
        sub: &SubscriptionUpsert,
    ) -> StoreResult<Option<Subscription>>;

    async fn set_subscription_status(
        &self,
        external_id: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Subscription>>;

    /// Status `canceled`, keeping existing timestamps where none are given
    async fn cancel_subscription(
        &self,
        external_id: &str,
        canceled_at: Option<i64>,
        ended_at: Option<i64>,
    ) -> StoreResult<Option<Subscription>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Clear `users.subscription_id` when it still points at `external_id`
    async fn clear_user_subscription(&self, user_id: &str, external_id: &str)
    -> StoreResult<bool>;

    /// Unique formatted key for `product_code`
    async fn generate_license_key(&self, product_code: &str) -> StoreResult<String>;

    async fn find_license(&self, user_id: &str, product_name: &str)
    -> StoreResult<Option<License>>;

    async fn insert_license(&self, license: &LicenseCreate) -> StoreResult<License>;
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgBillingStore {
    pool: PgPool,
}

impl PgBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BillingStore for PgBillingStore {
    async fn record_event(&self, event: &WebhookEventCreate) -> StoreResult<bool> {
        Ok(webhook_events::insert(&self.pool, event).await?)
    }

    async fn find_subscription(&self, external_id: &str) -> StoreResult<Option<Subscription>> {
        Ok(subscriptions::find_by_external_id(&self.pool, external_id).await?)
    }

    async fn insert_subscription(&self, sub: &SubscriptionUpsert) -> StoreResult<Subscription> {
        subscriptions::insert(&self.pool, sub)
            .await
            .map_err(|e| StoreError::from_insert(e, &sub.external_subscription_id))
    }

    async fn update_subscription(
        &self,
        sub: &SubscriptionUpsert,
    ) -> StoreResult<Option<Subscription>> {
        Ok(subscriptions::update(&self.pool, sub).await?)
    }

    async fn set_subscription_status(
        &self,
        external_id: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Subscription>> {
        Ok(subscriptions::update_status(&self.pool, external_id, status.as_db()).await?)
    }

    async fn cancel_subscription(
        &self,
        external_id: &str,
        canceled_at: Option<i64>,
        ended_at: Option<i64>,
    ) -> StoreResult<Option<Subscription>> {
        Ok(subscriptions::mark_canceled(&self.pool, external_id, canceled_at, ended_at).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(users::find_by_email(&self.pool, email).await?)
    }

    async fn clear_user_subscription(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> StoreResult<bool> {
        Ok(users::clear_subscription(&self.pool, user_id, external_id).await?)
    }

    async fn generate_license_key(&self, product_code: &str) -> StoreResult<String> {
        Ok(licenses::generate_key(&self.pool, product_code).await?)
    }

    async fn find_license(
        &self,
        user_id: &str,
        product_name: &str,
    ) -> StoreResult<Option<License>> {
        Ok(licenses::find_by_user_product(&self.pool, user_id, product_name).await?)
    }

    async fn insert_license(&self, license: &LicenseCreate) -> StoreResult<License> {
        licenses::insert(&self.pool, license).await.map_err(|e| {
            StoreError::from_insert(e, &format!("{}/{}", license.user_id, license.product_name))
        })
    }
}
