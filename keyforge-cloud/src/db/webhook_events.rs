//! Audit log of received webhook events (insert-only)

use shared::models::WebhookEventCreate;
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

/// Insert an event; `false` when its external id was already recorded
pub async fn insert(pool: &PgPool, event: &WebhookEventCreate) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO webhook_events (id, event_type, category, external_event_id, payload, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (external_event_id) DO NOTHING",
    )
    .bind(snowflake_id())
    .bind(&event.event_type)
    .bind(&event.category)
    .bind(&event.external_event_id)
    .bind(&event.payload)
    .bind(now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
