//! Holidays (global or per station)

use chrono::NaiveDate;
use shared::models::{Holiday, HolidayCategory, HolidayCreate, HolidayUpdate};
use sqlx::PgPool;

const COLUMNS: &str = "id, station_id, name, date, category, is_active, created_at";

/// Global holidays plus the station's own
pub async fn list_for_station(pool: &PgPool, station_id: i64) -> Result<Vec<Holiday>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM holidays WHERE station_id IS NULL OR station_id = $1 ORDER BY date"
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

/// Active holiday dates applying to a station within `[from, to]`
pub async fn active_dates(
    pool: &PgPool,
    station_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<NaiveDate>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT DISTINCT date FROM holidays
        WHERE is_active AND (station_id IS NULL OR station_id = $1) AND date BETWEEN $2 AND $3
        "#,
    )
    .bind(station_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Holiday>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM holidays WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, data: &HolidayCreate, now: i64) -> Result<Holiday, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO holidays (station_id, name, date, category, is_active, created_at)
        VALUES ($1, $2, $3, $4, TRUE, $5)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.station_id)
    .bind(data.name.trim())
    .bind(data.date)
    .bind(data.category.unwrap_or(HolidayCategory::National))
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(pool: &PgPool, id: i64, data: &HolidayUpdate) -> Result<Option<Holiday>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE holidays SET
            name = COALESCE($2, name),
            date = COALESCE($3, date),
            category = COALESCE($4, category),
            is_active = COALESCE($5, is_active)
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.date)
    .bind(data.category)
    .bind(data.is_active)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM holidays WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
