//! Notification preferences, inbox and broadcast history

use shared::models::{
    InboxNotification, NotificationHistory, NotificationPreferences, NotificationPreferencesUpdate,
};
use sqlx::PgPool;

const PREF_COLUMNS: &str = "user_id, notify_new_planning_published, notify_my_shift_changed, \
     notify_availability_deadline, deadline_warning_days, notify_shift_swap_updates";

const INBOX_COLUMNS: &str = "id, user_id, kind, title, body, url, is_read, created_at";

/// Stored preferences, or the defaults when the user never saved any
pub async fn preferences(pool: &PgPool, user_id: i64) -> Result<NotificationPreferences, sqlx::Error> {
    let prefs: Option<NotificationPreferences> = sqlx::query_as(&format!(
        "SELECT {PREF_COLUMNS} FROM notification_preferences WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(prefs.unwrap_or_else(|| NotificationPreferences::defaults(user_id)))
}

pub async fn save_preferences(
    pool: &PgPool,
    user_id: i64,
    update: &NotificationPreferencesUpdate,
) -> Result<NotificationPreferences, sqlx::Error> {
    let current = preferences(pool, user_id).await?;
    sqlx::query_as(&format!(
        r#"
        INSERT INTO notification_preferences (user_id, notify_new_planning_published, notify_my_shift_changed,
                                              notify_availability_deadline, deadline_warning_days, notify_shift_swap_updates)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id) DO UPDATE SET
            notify_new_planning_published = EXCLUDED.notify_new_planning_published,
            notify_my_shift_changed = EXCLUDED.notify_my_shift_changed,
            notify_availability_deadline = EXCLUDED.notify_availability_deadline,
            deadline_warning_days = EXCLUDED.deadline_warning_days,
            notify_shift_swap_updates = EXCLUDED.notify_shift_swap_updates
        RETURNING {PREF_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(update.notify_new_planning_published.unwrap_or(current.notify_new_planning_published))
    .bind(update.notify_my_shift_changed.unwrap_or(current.notify_my_shift_changed))
    .bind(update.notify_availability_deadline.unwrap_or(current.notify_availability_deadline))
    .bind(update.deadline_warning_days.unwrap_or(current.deadline_warning_days))
    .bind(update.notify_shift_swap_updates.unwrap_or(current.notify_shift_swap_updates))
    .fetch_one(pool)
    .await
}

/// Active users with at least one push subscription and their effective
/// preferences (deadline check)
pub async fn subscribed_users(pool: &PgPool) -> Result<Vec<NotificationPreferences>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT u.id AS user_id,
               COALESCE(p.notify_new_planning_published, TRUE) AS notify_new_planning_published,
               COALESCE(p.notify_my_shift_changed, TRUE) AS notify_my_shift_changed,
               COALESCE(p.notify_availability_deadline, TRUE) AS notify_availability_deadline,
               COALESCE(p.deadline_warning_days, 3) AS deadline_warning_days,
               COALESCE(p.notify_shift_swap_updates, TRUE) AS notify_shift_swap_updates
        FROM users u
        LEFT JOIN notification_preferences p ON p.user_id = u.id
        WHERE u.is_active
          AND EXISTS (SELECT 1 FROM push_subscriptions s WHERE s.user_id = u.id)
        "#,
    )
    .fetch_all(pool)
    .await
}

// ── Inbox ──

pub async fn insert_inbox(
    pool: &PgPool,
    user_id: i64,
    kind: &str,
    title: &str,
    body: &str,
    url: Option<&str>,
    now: i64,
) -> Result<InboxNotification, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO notifications (user_id, kind, title, body, url, is_read, created_at)
        VALUES ($1, $2, $3, $4, $5, FALSE, $6)
        RETURNING {INBOX_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(kind)
    .bind(title)
    .bind(body)
    .bind(url)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list_inbox(
    pool: &PgPool,
    user_id: i64,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<InboxNotification>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {INBOX_COLUMNS} FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
        ORDER BY created_at DESC, id DESC
        LIMIT $3
        "#
    ))
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn mark_read(pool: &PgPool, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ── Broadcast history ──

pub async fn record_history(
    pool: &PgPool,
    station_id: i64,
    sent_by: i64,
    title: &str,
    body: &str,
    recipient_count: i32,
    now: i64,
) -> Result<NotificationHistory, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO notification_history (station_id, sent_by, title, body, recipient_count, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, station_id, sent_by, title, body, recipient_count, created_at
        "#,
    )
    .bind(station_id)
    .bind(sent_by)
    .bind(title)
    .bind(body)
    .bind(recipient_count)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn list_history(pool: &PgPool, station_id: i64) -> Result<Vec<NotificationHistory>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT id, station_id, sent_by, title, body, recipient_count, created_at
        FROM notification_history
        WHERE station_id = $1
        ORDER BY created_at DESC
        LIMIT 100
        "#,
    )
    .bind(station_id)
    .fetch_all(pool)
    .await
}
