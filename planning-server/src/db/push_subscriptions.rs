//! Browser push subscriptions

use shared::models::PushSubscription;
use sqlx::PgPool;

const COLUMNS: &str = "id, user_id, endpoint, p256dh, auth, created_at";

/// Insert or refresh the keys of (user, endpoint)
pub async fn upsert(
    pool: &PgPool,
    user_id: i64,
    endpoint: &str,
    p256dh: &str,
    auth: &str,
    now: i64,
) -> Result<PushSubscription, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth, created_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (user_id, endpoint) DO UPDATE SET p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(endpoint)
    .bind(p256dh)
    .bind(auth)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, user_id: i64, endpoint: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = $1 AND endpoint = $2")
        .bind(user_id)
        .bind(endpoint)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Drop an endpoint the push service reported as gone
pub async fn delete_by_id(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<PushSubscription>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM push_subscriptions WHERE user_id = $1"))
        .bind(user_id)
        .fetch_all(pool)
        .await
}
