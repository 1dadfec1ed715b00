//! User queries, hour limits, display settings and cross-team access

use shared::models::{Role, Station, User, UserUpdate};
use sqlx::PgPool;

const COLUMNS: &str = "id, station_id, username, password_hash, first_name, last_name, email, role, \
     is_active, min_hours, max_hours, preferred_hours, dark_mode, shift_reminder_hours, \
     created_at, updated_at";

/// Row data for a new user; the password is already hashed
pub struct NewUser<'a> {
    pub station_id: i64,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: Option<&'a str>,
    pub role: Role,
    pub min_hours: i32,
    pub max_hours: i32,
    pub preferred_hours: i32,
}

/// Current account state behind a session token
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct SessionAccount {
    pub is_active: bool,
    pub role: Role,
    /// Whether the account may still use the session's station
    pub station_allowed: bool,
}

pub async fn session_account(
    pool: &PgPool,
    id: i64,
    station_id: i64,
) -> Result<Option<SessionAccount>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT u.is_active, u.role,
               (u.station_id = $2 OR u.role = 'supervisor'
                OR EXISTS (SELECT 1 FROM user_station_access a
                           WHERE a.user_id = u.id AND a.station_id = $2)) AS station_allowed
        FROM users u WHERE u.id = $1
        "#,
    )
    .bind(id)
    .bind(station_id)
    .fetch_optional(pool)
    .await
}

pub async fn find(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Usernames are unique per station, so the login lookup is global by name
pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE lower(username) = lower($1) ORDER BY id"
    ))
    .bind(username)
    .fetch_all(pool)
    .await
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE lower(email) = lower($1) AND is_active ORDER BY id LIMIT 1"
    ))
    .bind(email.trim())
    .fetch_optional(pool)
    .await
}

pub async fn list_by_station(pool: &PgPool, station_id: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE station_id = $1 ORDER BY last_name, first_name"
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

pub async fn list_active_by_station(pool: &PgPool, station_id: i64) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users WHERE station_id = $1 AND is_active ORDER BY last_name, first_name"
    ))
    .bind(station_id)
    .fetch_all(pool)
    .await
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY station_id, last_name, first_name"
    ))
    .fetch_all(pool)
    .await
}

pub async fn list_by_ids(pool: &PgPool, ids: &[i64]) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE id = ANY($1) AND is_active"))
        .bind(ids)
        .fetch_all(pool)
        .await
}

pub async fn create(pool: &PgPool, data: &NewUser<'_>, now: i64) -> Result<User, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        INSERT INTO users (station_id, username, password_hash, first_name, last_name, email, role,
                           min_hours, max_hours, preferred_hours, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(data.station_id)
    .bind(data.username)
    .bind(data.password_hash)
    .bind(data.first_name)
    .bind(data.last_name)
    .bind(data.email)
    .bind(data.role)
    .bind(data.min_hours)
    .bind(data.max_hours)
    .bind(data.preferred_hours)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Partial update; the username is expected to be normalised already
pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &UserUpdate,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE users SET
            username = COALESCE($2, username),
            first_name = COALESCE($3, first_name),
            last_name = COALESCE($4, last_name),
            email = COALESCE($5, email),
            role = COALESCE($6, role),
            is_active = COALESCE($7, is_active),
            station_id = COALESCE($8, station_id),
            min_hours = COALESCE($9, min_hours),
            max_hours = COALESCE($10, max_hours),
            preferred_hours = COALESCE($11, preferred_hours),
            updated_at = $12
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(data.username.as_deref())
    .bind(data.first_name.as_deref())
    .bind(data.last_name.as_deref())
    .bind(data.email.as_deref())
    .bind(data.role)
    .bind(data.is_active)
    .bind(data.station_id)
    .bind(data.min_hours)
    .bind(data.max_hours)
    .bind(data.preferred_hours)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Delete a user. Their shifts from `from_millis` on go back to open, older
/// shifts keep their history with the user removed.
pub async fn delete(pool: &PgPool, id: i64, from_millis: i64, now: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query(
        "UPDATE shifts SET user_id = NULL, status = 'open', updated_at = $3 WHERE user_id = $1 AND start_time >= $2",
    )
    .bind(id)
    .bind(from_millis)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    sqlx::query("UPDATE shifts SET user_id = NULL, updated_at = $2 WHERE user_id = $1")
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_password(pool: &PgPool, id: i64, password_hash: &str, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_hour_preferences(
    pool: &PgPool,
    id: i64,
    max_hours: i32,
    preferred_hours: i32,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        "UPDATE users SET max_hours = $2, preferred_hours = $3, updated_at = $4 WHERE id = $1 RETURNING {COLUMNS}"
    ))
    .bind(id)
    .bind(max_hours)
    .bind(preferred_hours)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn set_display_settings(
    pool: &PgPool,
    id: i64,
    dark_mode: Option<bool>,
    shift_reminder_hours: Option<i32>,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!(
        r#"
        UPDATE users SET
            dark_mode = COALESCE($2, dark_mode),
            shift_reminder_hours = COALESCE($3, shift_reminder_hours),
            updated_at = $4
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(dark_mode)
    .bind(shift_reminder_hours)
    .bind(now)
    .fetch_optional(pool)
    .await
}

// ── Cross-team access ──

pub async fn grant_station_access(
    pool: &PgPool,
    user_id: i64,
    station_id: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO user_station_access (user_id, station_id, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(station_id)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn revoke_station_access(pool: &PgPool, user_id: i64, station_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_station_access WHERE user_id = $1 AND station_id = $2")
        .bind(user_id)
        .bind(station_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn has_station_access(pool: &PgPool, user_id: i64, station_id: i64) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM user_station_access WHERE user_id = $1 AND station_id = $2)",
    )
    .bind(user_id)
    .bind(station_id)
    .fetch_one(pool)
    .await
}

/// Home station plus stations granted through cross-team access
pub async fn accessible_stations(pool: &PgPool, user: &User) -> Result<Vec<Station>, sqlx::Error> {
    if user.role.is_supervisor() {
        return super::stations::list(pool).await;
    }
    sqlx::query_as(
        r#"
        SELECT s.id, s.name, s.code, s.display_name, s.created_at
        FROM stations s
        WHERE s.id = $2
           OR s.id IN (SELECT station_id FROM user_station_access WHERE user_id = $1)
        ORDER BY s.name
        "#,
    )
    .bind(user.id)
    .bind(user.station_id)
    .fetch_all(pool)
    .await
}
