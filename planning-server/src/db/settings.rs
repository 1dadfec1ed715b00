//! System-wide key/value settings

use shared::models::SystemSetting;
use sqlx::PgPool;

pub const DEADLINE_DAYS: &str = "deadline_days";
pub const DEFAULT_DEADLINE_DAYS: i64 = 21;
/// Local date (`YYYY-MM-DD`) the deadline warnings last went out
pub const DEADLINE_CHECK_LAST_RUN: &str = "deadline_check_last_run";

pub async fn get(pool: &PgPool, key: &str) -> Result<Option<SystemSetting>, sqlx::Error> {
    sqlx::query_as("SELECT key, value, updated_at FROM system_settings WHERE key = $1")
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn set(pool: &PgPool, key: &str, value: &str, now: i64) -> Result<SystemSetting, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO system_settings (key, value, updated_at) VALUES ($1, $2, $3)
        ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        RETURNING key, value, updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Preference deadline offset in days; a missing or garbled value falls back to 21
pub async fn deadline_days(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let setting = get(pool, DEADLINE_DAYS).await?;
    Ok(setting
        .and_then(|s| s.value.trim().parse::<i64>().ok())
        .filter(|days| *days >= 0)
        .unwrap_or(DEFAULT_DEADLINE_DAYS))
}
