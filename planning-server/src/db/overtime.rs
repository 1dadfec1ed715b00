//! Overtime queries

use chrono::NaiveDate;
use shared::models::{Overtime, OvertimeWithUser};
use sqlx::PgPool;

const COLUMNS: &str = "id, user_id, shift_id, station_id, date, start_time, duration_minutes, \
     reason, month, year, created_at, updated_at";

pub struct NewOvertime<'a> {
    pub user_id: i64,
    pub shift_id: i64,
    pub station_id: i64,
    pub date: NaiveDate,
    pub start_time: i64,
    pub duration_minutes: i32,
    pub reason: &'a str,
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Overtime>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM overtime WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, data: &NewOvertime<'_>, now: i64) -> Result<Overtime, sqlx::Error> {
    use chrono::Datelike;
    sqlx::query_as(&format!(
        r#"
        INSERT INTO overtime (user_id, shift_id, station_id, date, start_time, duration_minutes,
                              reason, month, year, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.user_id)
    .bind(data.shift_id)
    .bind(data.station_id)
    .bind(data.date)
    .bind(data.start_time)
    .bind(data.duration_minutes)
    .bind(data.reason)
    .bind(data.date.month() as i32)
    .bind(data.date.year())
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Replace the mutable fields; month and year follow the date
pub async fn update(
    pool: &PgPool,
    id: i64,
    date: NaiveDate,
    start_time: i64,
    duration_minutes: i32,
    reason: &str,
    now: i64,
) -> Result<Option<Overtime>, sqlx::Error> {
    use chrono::Datelike;
    sqlx::query_as(&format!(
        r#"
        UPDATE overtime SET
            date = $2, start_time = $3, duration_minutes = $4, reason = $5,
            month = $6, year = $7, updated_at = $8
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(date)
    .bind(start_time)
    .bind(duration_minutes)
    .bind(reason)
    .bind(date.month() as i32)
    .bind(date.year())
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM overtime WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: i64,
    month: i32,
    year: i32,
) -> Result<Vec<Overtime>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM overtime WHERE user_id = $1 AND month = $2 AND year = $3 ORDER BY date, start_time"
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
) -> Result<Vec<OvertimeWithUser>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT o.id, o.user_id, o.shift_id, o.station_id, o.date, o.start_time, o.duration_minutes,
               o.reason, o.month, o.year, o.created_at, o.updated_at, u.first_name, u.last_name
        FROM overtime o
        JOIN users u ON u.id = o.user_id
        WHERE o.station_id = $1 AND o.month = $2 AND o.year = $3
        ORDER BY o.date, o.start_time
        "#,
    )
    .bind(station_id)
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

/// Every station's overtime for a month (monthly report)
pub async fn list_month_all_stations(
    pool: &PgPool,
    month: i32,
    year: i32,
) -> Result<Vec<OvertimeWithUser>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT o.id, o.user_id, o.shift_id, o.station_id, o.date, o.start_time, o.duration_minutes,
               o.reason, o.month, o.year, o.created_at, o.updated_at, u.first_name, u.last_name
        FROM overtime o
        JOIN users u ON u.id = o.user_id
        WHERE o.month = $1 AND o.year = $2
        ORDER BY o.station_id, o.date, o.start_time
        "#,
    )
    .bind(month)
    .bind(year)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use crate::db::schema_column;

    #[test]
    fn test_overtime_survives_shift_removal() {
        // Regenerating a month deletes its shifts; overtime must only lose the link
        let column = schema_column("overtime", "shift_id").unwrap();
        assert_eq!(column, "shift_id BIGINT REFERENCES shifts(id) ON DELETE SET NULL,");
        assert!(!column.contains("NOT NULL"));
        assert!(!column.contains("CASCADE"));
    }
}
