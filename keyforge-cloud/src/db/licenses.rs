use shared::models::{License, LicenseCreate};
use shared::util::{now_millis, snowflake_id};
use sqlx::PgPool;

/// Call the `generate_license_key` stored procedure
pub async fn generate_key(pool: &PgPool, product_code: &str) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT generate_license_key($1)")
        .bind(product_code)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn find_by_user_product(
    pool: &PgPool,
    user_id: &str,
    product_name: &str,
) -> Result<Option<License>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, product_name, license_key, active, created_at, updated_at
         FROM licenses WHERE user_id = $1 AND product_name = $2",
    )
    .bind(user_id)
    .bind(product_name)
    .fetch_optional(pool)
    .await
}

pub async fn insert(pool: &PgPool, license: &LicenseCreate) -> Result<License, sqlx::Error> {
    let now = now_millis();
    sqlx::query_as(
        "INSERT INTO licenses (id, user_id, product_name, license_key, active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, TRUE, $5, $5)
         RETURNING id, user_id, product_name, license_key, active, created_at, updated_at",
    )
    .bind(snowflake_id())
    .bind(&license.user_id)
    .bind(&license.product_name)
    .bind(&license.license_key)
    .bind(now)
    .fetch_one(pool)
    .await
}
