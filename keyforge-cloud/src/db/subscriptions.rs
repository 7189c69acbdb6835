use shared::models::{Subscription, SubscriptionUpsert};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

const COLUMNS: &str = "id, external_subscription_id, user_id, price_id, currency, billing_interval,
    status, current_period_start, current_period_end, cancel_at_period_end, amount, customer_id,
    metadata, canceled_at, ended_at, created_at, updated_at";

pub async fn find_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM subscriptions WHERE external_subscription_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, sub: &SubscriptionUpsert) -> Result<Subscription, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(&format!(
        "INSERT INTO subscriptions (id, external_subscription_id, user_id, price_id, currency,
            billing_interval, status, current_period_start, current_period_end,
            cancel_at_period_end, amount, customer_id, metadata, canceled_at, ended_at,
            created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
         RETURNING {COLUMNS}"
    ))
    .bind(snowflake_id())
    .bind(&sub.external_subscription_id)
    .bind(&sub.user_id)
    .bind(&sub.price_id)
    .bind(&sub.currency)
    .bind(&sub.interval)
    .bind(&sub.status)
    .bind(sub.current_period_start)
    .bind(sub.current_period_end)
    .bind(sub.cancel_at_period_end)
    .bind(sub.amount)
    .bind(&sub.customer_id)
    .bind(&sub.metadata)
    .bind(sub.canceled_at)
    .bind(sub.ended_at)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    sub: &SubscriptionUpsert,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE subscriptions SET
            user_id = $2, price_id = $3, currency = $4, billing_interval = $5, status = $6,
            current_period_start = $7, current_period_end = $8, cancel_at_period_end = $9,
            amount = $10, customer_id = $11, metadata = $12, canceled_at = $13, ended_at = $14,
            updated_at = $15
         WHERE external_subscription_id = $1
         RETURNING {COLUMNS}"
    ))
    .bind(&sub.external_subscription_id)
    .bind(&sub.user_id)
    .bind(&sub.price_id)
    .bind(&sub.currency)
    .bind(&sub.interval)
    .bind(&sub.status)
    .bind(sub.current_period_start)
    .bind(sub.current_period_end)
    .bind(sub.cancel_at_period_end)
    .bind(sub.amount)
    .bind(&sub.customer_id)
    .bind(&sub.metadata)
    .bind(sub.canceled_at)
    .bind(sub.ended_at)
    .bind(now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn update_status(
    pool: &PgPool,
    external_id: &str,
    status: &str,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE subscriptions SET status = $1, updated_at = $2
         WHERE external_subscription_id = $3
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now_millis())
    .bind(external_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_canceled(
    pool: &PgPool,
    external_id: &str,
    canceled_at: Option<i64>,
    ended_at: Option<i64>,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE subscriptions SET status = 'canceled',
            canceled_at = COALESCE($1, canceled_at),
            ended_at = COALESCE($2, ended_at),
            updated_at = $3
         WHERE external_subscription_id = $4
         RETURNING {COLUMNS}"
    ))
    .bind(canceled_at)
    .bind(ended_at)
    .bind(now_millis())
    .bind(external_id)
    .fetch_optional(pool)
    .await
}
