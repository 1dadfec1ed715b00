//! Shift queries, month replacement and reminder bookkeeping

use chrono::NaiveDate;
use shared::models::{Shift, ShiftStatus, ShiftType, User};
use sqlx::PgPool;

use crate::scheduling::PlannedShift;

const COLUMNS: &str = "id, station_id, user_id, date, start_time, end_time, shift_type, status, \
     is_split_shift, month, year, is_emergency_scheduling, emergency_reason, reminder_sent_at, \
     created_at, updated_at";

/// Fully resolved shift row to insert
pub struct NewShift {
    pub station_id: i64,
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
    pub shift_type: ShiftType,
    pub is_split_shift: bool,
}

/// Resolved field values for an update
pub struct ShiftChanges {
    pub user_id: Option<i64>,
    pub start_time: i64,
    pub end_time: i64,
    pub shift_type: ShiftType,
    pub is_split_shift: bool,
}

/// Planned shift due for a reminder, with what the message needs
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DueReminder {
    pub shift_id: i64,
    pub user_id: i64,
    pub start_time: i64,
    pub shift_type: ShiftType,
}

pub async fn list_month(
    pool: &PgPool,
    station_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE station_id = $1 AND month = $2 AND year = $3 ORDER BY date, start_time, id"
    ))
    .bind(station_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

pub async fn list_open(
    pool: &PgPool,
    station_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        SELECT {COLUMNS} FROM shifts
        WHERE station_id = $1 AND month = $2 AND year = $3 AND status = 'open'
        ORDER BY date, start_time, id
        "#
    ))
    .bind(station_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE user_id = $1 AND month = $2 AND year = $3 ORDER BY date, start_time, id"
    ))
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

/// Shifts of every station for a month (monthly report)
pub async fn list_month_all_stations(pool: &PgPool, month: i32, year: i32) -> Result<Vec<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE month = $1 AND year = $2 ORDER BY station_id, date, start_time, id"
    ))
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

/// Shifts starting within `[from, to)` (kiosk board)
pub async fn list_range(pool: &PgPool, station_id: i64, from: i64, to: i64) -> Result<Vec<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shifts WHERE station_id = $1 AND start_time >= $2 AND start_time < $3 ORDER BY start_time, id"
    ))
    .bind(station_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Shift>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM shifts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, data: &NewShift, now: i64) -> Result<Shift, sqlx::Error> {
    use chrono::Datelike;
    sqlx::query_as(&format!(
        r#"
        INSERT INTO shifts (station_id, user_id, date, start_time, end_time, shift_type, status,
                            is_split_shift, month, year, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.station_id)
    .bind(data.user_id)
    .bind(data.date)
    .bind(data.start_time)
    .bind(data.end_time)
    .bind(data.shift_type)
    .bind(ShiftStatus::for_assignment(data.user_id))
    .bind(data.is_split_shift)
    .bind(data.date.month() as i32)
    .bind(data.date.year())
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Apply changes. A changed start clears `reminder_sent_at`, and the
/// emergency marker is dropped when the shift is unassigned.
pub async fn update(
    pool: &PgPool,
    id: i64,
    changes: &ShiftChanges,
    now: i64,
) -> Result<Option<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE shifts SET
            user_id = $2,
            status = $3,
            start_time = $4,
            end_time = $5,
            shift_type = $6,
            is_split_shift = $7,
            reminder_sent_at = CASE WHEN start_time = $4 AND user_id IS NOT DISTINCT FROM $2
                                    THEN reminder_sent_at ELSE NULL END,
            is_emergency_scheduling = is_emergency_scheduling AND $2 IS NOT NULL,
            emergency_reason = CASE WHEN $2 IS NULL THEN NULL ELSE emergency_reason END,
            updated_at = $8
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(changes.user_id)
    .bind(ShiftStatus::for_assignment(changes.user_id))
    .bind(changes.start_time)
    .bind(changes.end_time)
    .bind(changes.shift_type)
    .bind(changes.is_split_shift)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shifts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Fill an open shift outside the normal rules. Returns `None` when the
/// shift is gone or no longer open.
pub async fn emergency_assign(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    reason: &str,
    now: i64,
) -> Result<Option<Shift>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE shifts SET
            user_id = $2,
            status = 'planned',
            is_emergency_scheduling = TRUE,
            emergency_reason = $3,
            reminder_sent_at = NULL,
            updated_at = $4
        WHERE id = $1 AND status = 'open'
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(user_id)
    .bind(reason)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Active station users without a shift overlapping `[start, end)`
pub async fn available_users(
    pool: &PgPool,
    station_id: i64,
    start: i64,
    end: i64,
) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT u.id, u.station_id, u.username, u.password_hash, u.first_name, u.last_name, u.email,
               u.role, u.is_active, u.min_hours, u.max_hours, u.preferred_hours, u.dark_mode,
               u.shift_reminder_hours, u.created_at, u.updated_at
        FROM users u
        WHERE u.station_id = $1 AND u.is_active
          AND NOT EXISTS (
              SELECT 1 FROM shifts s
              WHERE s.user_id = u.id AND s.start_time < $3 AND $2 < s.end_time
          )
        ORDER BY u.last_name, u.first_name
        "#,
    )
    .bind(station_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Replace a station's month with a generated plan, atomically
pub async fn replace_month(
    pool: &PgPool,
    station_id: i64,
    month: i32,
    year: i32,
    plan: &[PlannedShift],
    now: i64,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM shifts WHERE station_id = $1 AND month = $2 AND year = $3")
        .bind(station_id)
        .bind(month)
        .bind(year)
        .execute(&mut *tx)
        .await?;

    let mut inserted = 0;
    for shift in plan {
        sqlx::query(
            r#"
            INSERT INTO shifts (station_id, user_id, date, start_time, end_time, shift_type, status,
                                is_split_shift, month, year, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            "#,
        )
        .bind(station_id)
        .bind(shift.user_id)
        .bind(shift.date)
        .bind(shift.start_time)
        .bind(shift.end_time)
        .bind(shift.shift_type)
        .bind(ShiftStatus::for_assignment(shift.user_id))
        .bind(shift.is_split_shift)
        .bind(month)
        .bind(year)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        inserted += 1;
    }
    tx.commit().await?;
    Ok(inserted)
}

/// Planned shifts starting after `now` whose user's reminder window has opened
pub async fn due_reminders(pool: &PgPool, now: i64) -> Result<Vec<DueReminder>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.id AS shift_id, s.user_id AS user_id, s.start_time, s.shift_type
        FROM shifts s
        JOIN users u ON u.id = s.user_id
        WHERE s.status = 'planned'
          AND s.reminder_sent_at IS NULL
          AND u.is_active
          AND u.shift_reminder_hours > 0
          AND s.start_time > $1
          AND s.start_time <= $1 + u.shift_reminder_hours::BIGINT * 3600000
        ORDER BY s.start_time
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await
}

pub async fn mark_reminder_sent(pool: &PgPool, id: i64, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE shifts SET reminder_sent_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}
