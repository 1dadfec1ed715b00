//! Per-station weekday generation settings

use shared::models::{WeekdayConfig, WeekdayConfigUpdate};
use sqlx::PgPool;

const COLUMNS: &str = "id, station_id, day_of_week, enable_day_shifts, enable_night_shifts, \
     day_shift_count, night_shift_count, full_night_shifts";

pub async fn list(pool: &PgPool, station_id: i64) -> Result<Vec<WeekdayConfig>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM weekday_configs WHERE station_id = $1 ORDER BY day_of_week"
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

/// Create the default row for every missing weekday, keep existing ones
pub async fn initialize(pool: &PgPool, station_id: i64) -> Result<Vec<WeekdayConfig>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for day in 0..7 {
        let defaults = WeekdayConfig::default_for(station_id, day);
        sqlx::query(
            r#"
            INSERT INTO weekday_configs (station_id, day_of_week, enable_day_shifts, enable_night_shifts,
                                         day_shift_count, night_shift_count, full_night_shifts)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (station_id, day_of_week) DO NOTHING
            "#,
        )
        .bind(station_id)
        .bind(day)
        .bind(defaults.enable_day_shifts)
        .bind(defaults.enable_night_shifts)
        .bind(defaults.day_shift_count)
        .bind(defaults.night_shift_count)
        .bind(defaults.full_night_shifts)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    list(pool, station_id).await
}

/// Update one weekday, creating it from defaults first if needed
pub async fn update(
    pool: &PgPool,
    station_id: i64,
    day_of_week: i32,
    data: &WeekdayConfigUpdate,
) -> Result<WeekdayConfig, sqlx::Error> {
    let defaults = WeekdayConfig::default_for(station_id, day_of_week);
    sqlx::query_as(&format!(
        r#"
        INSERT INTO weekday_configs (station_id, day_of_week, enable_day_shifts, enable_night_shifts,
                                     day_shift_count, night_shift_count, full_night_shifts)
        VALUES ($1, $2, COALESCE($3, $8), COALESCE($4, $9), COALESCE($5, $10), COALESCE($6, $11), COALESCE($7, $12))
        ON CONFLICT (station_id, day_of_week) DO UPDATE SET
            enable_day_shifts = COALESCE($3, weekday_configs.enable_day_shifts),
            enable_night_shifts = COALESCE($4, weekday_configs.enable_night_shifts),
            day_shift_count = COALESCE($5, weekday_configs.day_shift_count),
            night_shift_count = COALESCE($6, weekday_configs.night_shift_count),
            full_night_shifts = COALESCE($7, weekday_configs.full_night_shifts)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(station_id)
    .bind(day_of_week)
    .bind(data.enable_day_shifts)
    .bind(data.enable_night_shifts)
    .bind(data.day_shift_count)
    .bind(data.night_shift_count)
    .bind(data.full_night_shifts)
    .bind(defaults.enable_day_shifts)
    .bind(defaults.enable_night_shifts)
    .bind(defaults.day_shift_count)
    .bind(defaults.night_shift_count)
    .bind(defaults.full_night_shifts)
    .fetch_one(pool)
    .await
}
