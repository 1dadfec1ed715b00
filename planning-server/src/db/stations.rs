//! Station queries, station settings and force deletion

use shared::models::{Station, StationCreate, StationDependencies, StationUpdate};
use sqlx::PgPool;

pub const SETTING_SHIFT_SWAPS_ENABLED: &str = "shift_swaps_enabled";
pub const SETTING_KIOSK_TOKEN: &str = "kiosk_token";

const COLUMNS: &str = "id, name, code, display_name, created_at";

pub async fn list(pool: &PgPool) -> Result<Vec<Station>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM stations ORDER BY name"))
        .fetch_all(pool)
        .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<Station>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM stations WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(pool: &PgPool, data: &StationCreate, now: i64) -> Result<Station, sqlx::Error> {
    sqlx::query_as(&format!(
        "INSERT INTO stations (name, code, display_name, created_at) VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
    ))
    .bind(data.name.trim())
    .bind(data.code.trim())
    .bind(data.display_name.trim())
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &StationUpdate,
) -> Result<Option<Station>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE stations SET
            name = COALESCE($2, name),
            code = COALESCE($3, code),
            display_name = COALESCE($4, display_name)
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(data.code.as_deref().map(str::trim))
    .bind(data.display_name.as_deref().map(str::trim))
    .fetch_optional(pool)
    .await
}

pub async fn dependencies(pool: &PgPool, id: i64) -> Result<StationDependencies, sqlx::Error> {
    let (users, shifts, preferences): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users WHERE station_id = $1),
            (SELECT COUNT(*) FROM shifts WHERE station_id = $1),
            (SELECT COUNT(*) FROM shift_preferences WHERE station_id = $1)
        "#,
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(StationDependencies {
        users,
        shifts,
        preferences,
    })
}

/// Tables whose `station_id` blocks a station delete, in deletion order.
/// Users go last; their own rows cascade or are detached.
const FORCE_DELETE_TABLES: [&str; 6] = [
    "overtime",
    "shift_swap_requests",
    "shift_preferences",
    "shifts",
    "notification_history",
    "users",
];

/// Delete a station; with `force`, everything referencing it goes too.
/// Returns false when the station did not exist.
pub async fn delete(pool: &PgPool, id: i64, force: bool) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    if force {
        for table in FORCE_DELETE_TABLES {
            sqlx::query(&format!("DELETE FROM {table} WHERE station_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
    }
    let result = sqlx::query("DELETE FROM stations WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

// ── Station settings ──

pub async fn get_setting(
    pool: &PgPool,
    station_id: i64,
    key: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT value FROM station_settings WHERE station_id = $1 AND key = $2")
        .bind(station_id)
        .bind(key)
        .fetch_optional(pool)
        .await
}

pub async fn set_setting(
    pool: &PgPool,
    station_id: i64,
    key: &str,
    value: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO station_settings (station_id, key, value, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (station_id, key) DO UPDATE SET value = EXCLUDED.value, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(station_id)
    .bind(key)
    .bind(value)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

/// Swaps are enabled unless explicitly switched off
pub async fn shift_swaps_enabled(pool: &PgPool, station_id: i64) -> Result<bool, sqlx::Error> {
    let value = get_setting(pool, station_id, SETTING_SHIFT_SWAPS_ENABLED).await?;
    Ok(value.is_none_or(|v| v != "false"))
}

pub async fn find_by_kiosk_token(pool: &PgPool, token: &str) -> Result<Option<Station>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT s.id, s.name, s.code, s.display_name, s.created_at
        FROM stations s
        JOIN station_settings ss ON ss.station_id = s.id
        WHERE ss.key = $1 AND ss.value = $2
        "#,
    )
    .bind(SETTING_KIOSK_TOKEN)
    .bind(token)
    .fetch_optional(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_references;

    #[test]
    fn test_force_delete_covers_blocking_references() {
        let blocking: Vec<String> = schema_references("stations")
            .into_iter()
            .filter(|(_, column)| !column.contains("ON DELETE"))
            .map(|(table, _)| table)
            .collect();
        assert!(!blocking.is_empty());
        for table in &blocking {
            assert!(
                FORCE_DELETE_TABLES.contains(&table.as_str()),
                "{table} references stations without ON DELETE"
            );
        }
        assert_eq!(FORCE_DELETE_TABLES.last(), Some(&"users"));
    }
}
