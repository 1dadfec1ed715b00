//! Shift preference queries

use chrono::NaiveDate;
use shared::models::{PreferenceType, ShiftPreference, ShiftType};
use sqlx::PgPool;

const COLUMNS: &str =
    "id, user_id, station_id, date, shift_type, preference_type, month, year, notes, created_at";

pub struct PreferenceRow<'a> {
    pub user_id: i64,
    pub station_id: i64,
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub preference_type: PreferenceType,
    pub month: i32,
    pub year: i32,
    pub notes: Option<&'a str>,
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<ShiftPreference>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shift_preferences WHERE user_id = $1 AND month = $2 AND year = $3 ORDER BY date, shift_type"
    ))
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

pub async fn list_for_station(
    pool: &PgPool,
    station_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<ShiftPreference>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM shift_preferences WHERE station_id = $1 AND month = $2 AND year = $3 ORDER BY user_id, date, shift_type"
    ))
    .bind(station_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<ShiftPreference>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM shift_preferences WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert or replace the preference for (user, date, shift_type)
pub async fn upsert(pool: &PgPool, row: &PreferenceRow<'_>, now: i64) -> Result<ShiftPreference, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO shift_preferences (user_id, station_id, date, shift_type, preference_type, month, year, notes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (user_id, date, shift_type) DO UPDATE SET
            preference_type = EXCLUDED.preference_type,
            station_id = EXCLUDED.station_id,
            notes = EXCLUDED.notes
        RETURNING {COLUMNS}
        "#
    ))
    .bind(row.user_id)
    .bind(row.station_id)
    .bind(row.date)
    .bind(row.shift_type)
    .bind(row.preference_type)
    .bind(row.month)
    .bind(row.year)
    .bind(row.notes)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shift_preferences WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn clear_month(pool: &PgPool, user_id: i64, month: i32, year: i32) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM shift_preferences WHERE user_id = $1 AND month = $2 AND year = $3")
            .bind(user_id)
            .bind(month)
            .bind(year)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Number of preference rows per user for a station month (statistics)
pub async fn count_by_user(
    pool: &PgPool,
    station_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<(i64, i64)>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT user_id, COUNT(*) FROM shift_preferences
        WHERE station_id = $1 AND month = $2 AND year = $3
        GROUP BY user_id
        "#,
    )
    .bind(station_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}
