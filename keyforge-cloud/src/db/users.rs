use shared::models::User;
use sqlx::PgPool;

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT id, email, subscription_id FROM users WHERE lower(email) = lower($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await
}

/// Clear the denormalized subscription reference if it still names `external_id`
pub async fn clear_subscription(
    pool: &PgPool,
    user_id: &str,
    external_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET subscription_id = NULL WHERE id = $1 AND subscription_id = $2",
    )
    .bind(user_id)
    .bind(external_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
