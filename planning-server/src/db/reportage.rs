//! Monthly report configuration, recipients and send log

use shared::models::{
    ReportageConfig, ReportageConfigUpdate, ReportageLog, ReportageRecipient, ReportageRecipientCreate,
    ReportageRecipientUpdate,
};
use sqlx::PgPool;

const CONFIG_COLUMNS: &str = "enabled, days_after_month_end, email_subject, email_body, \
     last_sent_month, last_sent_year, updated_at";

const RECIPIENT_COLUMNS: &str = "id, email, name, is_active, created_at";

/// The singleton row, created with defaults on first access
pub async fn config(pool: &PgPool) -> Result<ReportageConfig, sqlx::Error> {
    let existing: Option<ReportageConfig> =
        sqlx::query_as(&format!("SELECT {CONFIG_COLUMNS} FROM reportage_config WHERE id = 1"))
            .fetch_optional(pool)
            .await?;
    if let Some(config) = existing {
        return Ok(config);
    }
    let defaults = ReportageConfig::default();
    sqlx::query_as(&format!(
        r#"
        INSERT INTO reportage_config (id, enabled, days_after_month_end, email_subject, email_body, updated_at)
        VALUES (1, $1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE SET id = reportage_config.id
        RETURNING {CONFIG_COLUMNS}
        "#
    ))
    .bind(defaults.enabled)
    .bind(defaults.days_after_month_end)
    .bind(&defaults.email_subject)
    .bind(&defaults.email_body)
    .bind(shared::util::now_millis())
    .fetch_one(pool)
    .await
}

pub async fn update_config(
    pool: &PgPool,
    data: &ReportageConfigUpdate,
    now: i64,
) -> Result<ReportageConfig, sqlx::Error> {
    config(pool).await?;
    sqlx::query_as(&format!(
        r#"
        UPDATE reportage_config SET
            enabled = COALESCE($1, enabled),
            days_after_month_end = COALESCE($2, days_after_month_end),
            email_subject = COALESCE($3, email_subject),
            email_body = COALESCE($4, email_body),
            updated_at = $5
        WHERE id = 1
        RETURNING {CONFIG_COLUMNS}
        "#
    ))
    .bind(data.enabled)
    .bind(data.days_after_month_end)
    .bind(data.email_subject.as_deref())
    .bind(data.email_body.as_deref())
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn mark_sent(pool: &PgPool, month: i32, year: i32, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE reportage_config SET last_sent_month = $1, last_sent_year = $2, updated_at = $3 WHERE id = 1")
        .bind(month)
        .bind(year)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Recipients ──

pub async fn list_recipients(pool: &PgPool) -> Result<Vec<ReportageRecipient>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {RECIPIENT_COLUMNS} FROM reportage_recipients ORDER BY email"))
        .fetch_all(pool)
        .await
}

pub async fn active_recipients(pool: &PgPool) -> Result<Vec<ReportageRecipient>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {RECIPIENT_COLUMNS} FROM reportage_recipients WHERE is_active ORDER BY email"
    ))
    .fetch_all(pool)
    .await
}

pub async fn create_recipient(
    pool: &PgPool,
    data: &ReportageRecipientCreate,
    now: i64,
) -> Result<ReportageRecipient, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO reportage_recipients (email, name, is_active, created_at) VALUES ($1, $2, TRUE, $3) RETURNING {RECIPIENT_COLUMNS}"
    ))
    .bind(data.email.trim())
    .bind(data.name.as_deref())
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update_recipient(
    pool: &PgPool,
    id: i64,
    data: &ReportageRecipientUpdate,
) -> Result<Option<ReportageRecipient>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE reportage_recipients SET
            email = COALESCE($2, email),
            name = COALESCE($3, name),
            is_active = COALESCE($4, is_active)
        WHERE id = $1
        RETURNING {RECIPIENT_COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.email.as_deref().map(str::trim))
    .bind(data.name.as_deref())
    .bind(data.is_active)
    .fetch_optional(pool)
    .await
}

pub async fn delete_recipient(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reportage_recipients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Send log ──

pub async fn insert_log(
    pool: &PgPool,
    month: i32,
    year: i32,
    recipient_count: i32,
    error_message: Option<&str>,
    now: i64,
) -> Result<ReportageLog, sqlx::Error> {
    let status = if error_message.is_some() { "failed" } else { "success" };
    sqlx::query_as(
        r#"
        INSERT INTO reportage_logs (month, year, recipient_count, status, error_message, sent_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, month, year, recipient_count, status, error_message, sent_at
        "#,
    )
    .bind(month)
    .bind(year)
    .bind(recipient_count)
    .bind(status)
    .bind(error_message)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list_logs(pool: &PgPool) -> Result<Vec<ReportageLog>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, month, year, recipient_count, status, error_message, sent_at FROM reportage_logs ORDER BY sent_at DESC LIMIT 50",
    )
    .fetch_all(pool)
    .await
}
