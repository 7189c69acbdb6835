//! In-memory [`BillingStore`] with the same uniqueness rules as the schema

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shared::models::{
    License, LicenseCreate, Subscription, SubscriptionStatus, SubscriptionUpsert, User,
    WebhookEvent, WebhookEventCreate,
};
use shared::util::{now_millis, snowflake_id};
use tokio::sync::Mutex;

use super::{BillingStore, StoreError, StoreResult};
use crate::webhook::license_key::random_license_key;

#[derive(Default)]
struct Tables {
    webhook_events: Vec<WebhookEvent>,
    subscriptions: Vec<Subscription>,
    licenses: Vec<License>,
    users: Vec<User>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_event_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                users,
                ..Tables::default()
            }),
            fail_event_writes: AtomicBool::new(false),
        }
    }

    /// Make every audit-log insert fail with [`StoreError::Unavailable`]
    pub fn fail_event_writes(&self, fail: bool) {
        self.fail_event_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn webhook_events(&self) -> Vec<WebhookEvent> {
        self.tables.lock().await.webhook_events.clone()
    }

    pub async fn subscriptions(&self) -> Vec<Subscription> {
        self.tables.lock().await.subscriptions.clone()
    }

    pub async fn licenses(&self) -> Vec<License> {
        self.tables.lock().await.licenses.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.tables.lock().await.users.clone()
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.lock().await.users.push(user);
    }
}

fn apply_upsert(row: &mut Subscription, sub: &SubscriptionUpsert) {
    row.user_id = sub.user_id.clone();
    row.price_id = sub.price_id.clone();
    row.currency = sub.currency.clone();
    row.interval = sub.interval.clone();
    row.status = sub.status.clone();
    row.current_period_start = sub.current_period_start;
    row.current_period_end = sub.current_period_end;
    row.cancel_at_period_end = sub.cancel_at_period_end;
    row.amount = sub.amount;
    row.customer_id = sub.customer_id.clone();
    row.metadata = sub.metadata.clone();
    row.canceled_at = sub.canceled_at;
    row.ended_at = sub.ended_at;
    row.updated_at = now_millis();
}

#[async_trait]
impl BillingStore for MemoryStore {
    async fn record_event(&self, event: &WebhookEventCreate) -> StoreResult<bool> {
        if self.fail_event_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("webhook_events".to_string()));
        }
        let mut tables = self.tables.lock().await;
        if tables
            .webhook_events
            .iter()
            .any(|e| e.external_event_id == event.external_event_id)
        {
            return Ok(false);
        }
        tables.webhook_events.push(WebhookEvent {
            id: snowflake_id(),
            event_type: event.event_type.clone(),
            category: event.category.clone(),
            external_event_id: event.external_event_id.clone(),
            payload: event.payload.clone(),
            created_at: now_millis(),
        });
        Ok(true)
    }

    async fn find_subscription(&self, external_id: &str) -> StoreResult<Option<Subscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| s.external_subscription_id == external_id)
            .cloned())
    }

    async fn insert_subscription(&self, sub: &SubscriptionUpsert) -> StoreResult<Subscription> {
        let mut tables = self.tables.lock().await;
        if tables
            .subscriptions
            .iter()
            .any(|s| s.external_subscription_id == sub.external_subscription_id)
        {
            return Err(StoreError::Duplicate(sub.external_subscription_id.clone()));
        }
        let now = now_millis();
        let mut row = Subscription {
            id: snowflake_id(),
            external_subscription_id: sub.external_subscription_id.clone(),
            user_id: None,
            price_id: None,
            currency: None,
            interval: None,
            status: String::new(),
            current_period_start: None,
            current_period_end: None,
            cancel_at_period_end: false,
            amount: None,
            customer_id: None,
            metadata: serde_json::Value::Null,
            canceled_at: None,
            ended_at: None,
            created_at: now,
            updated_at: now,
        };
        apply_upsert(&mut row, sub);
        tables.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn update_subscription(
        &self,
        sub: &SubscriptionUpsert,
    ) -> StoreResult<Option<Subscription>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter_mut()
            .find(|s| s.external_subscription_id == sub.external_subscription_id)
            .map(|row| {
                apply_upsert(row, sub);
                row.clone()
            }))
    }

    async fn set_subscription_status(
        &self,
        external_id: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<Option<Subscription>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter_mut()
            .find(|s| s.external_subscription_id == external_id)
            .map(|row| {
                row.status = status.as_db().to_string();
                row.updated_at = now_millis();
                row.clone()
            }))
    }

    async fn cancel_subscription(
        &self,
        external_id: &str,
        canceled_at: Option<i64>,
        ended_at: Option<i64>,
    ) -> StoreResult<Option<Subscription>> {
        let mut tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter_mut()
            .find(|s| s.external_subscription_id == external_id)
            .map(|row| {
                row.status = SubscriptionStatus::Canceled.as_db().to_string();
                row.canceled_at = canceled_at.or(row.canceled_at);
                row.ended_at = ended_at.or(row.ended_at);
                row.updated_at = now_millis();
                row.clone()
            }))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        let email = email.trim();
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn clear_user_subscription(
        &self,
        user_id: &str,
        external_id: &str,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.subscription_id.as_deref() == Some(external_id))
        {
            Some(user) => {
                user.subscription_id = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn generate_license_key(&self, product_code: &str) -> StoreResult<String> {
        let tables = self.tables.lock().await;
        loop {
            let candidate = random_license_key(product_code);
            if !tables.licenses.iter().any(|l| l.license_key == candidate) {
                return Ok(candidate);
            }
        }
    }

    async fn find_license(
        &self,
        user_id: &str,
        product_name: &str,
    ) -> StoreResult<Option<License>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .licenses
            .iter()
            .find(|l| l.user_id == user_id && l.product_name == product_name)
            .cloned())
    }

    async fn insert_license(&self, license: &LicenseCreate) -> StoreResult<License> {
        let mut tables = self.tables.lock().await;
        if tables.licenses.iter().any(|l| {
            (l.user_id == license.user_id && l.product_name == license.product_name)
                || l.license_key == license.license_key
        }) {
            return Err(StoreError::Duplicate(format!(
                "{}/{}",
                license.user_id, license.product_name
            )));
        }
        let now = now_millis();
        let row = License {
            id: snowflake_id(),
            user_id: license.user_id.clone(),
            product_name: license.product_name.clone(),
            license_key: license.license_key.clone(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        tables.licenses.push(row.clone());
        Ok(row)
    }
}
