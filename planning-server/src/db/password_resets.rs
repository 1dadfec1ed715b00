//! Password reset tokens (stored as SHA-256 digests)

use sqlx::PgPool;

/// Reset links stay valid for one hour
pub const RESET_TOKEN_TTL_MS: i64 = 3_600_000;

pub async fn create(
    pool: &PgPool,
    user_id: i64,
    token_hash: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    // One live token per user
    sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1 AND used_at IS NULL")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(user_id)
    .bind(token_hash)
    .bind(now + RESET_TOKEN_TTL_MS)
    .bind(now)
    .execute(&mut *tx)
    .await?;
    tx.commit().await
}

/// Outcome of redeeming a token
#[derive(Debug, PartialEq, Eq)]
pub enum Redeem {
    Valid { user_id: i64 },
    Expired,
    Unknown,
}

/// Mark a token used and return its user, atomically with the password change
pub async fn redeem(
    pool: &PgPool,
    token_hash: &str,
    password_hash: &str,
    now: i64,
) -> Result<Redeem, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let row: Option<(i64, i64)> = sqlx::query_as(
        "SELECT user_id, expires_at FROM password_reset_tokens WHERE token_hash = $1 AND used_at IS NULL FOR UPDATE",
    )
    .bind(token_hash)
    .fetch_optional(&mut *tx)
    .await?;
    let Some((user_id, expires_at)) = row else {
        return Ok(Redeem::Unknown);
    };
    if expires_at <= now {
        return Ok(Redeem::Expired);
    }
    sqlx::query("UPDATE password_reset_tokens SET used_at = $2 WHERE token_hash = $1")
        .bind(token_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(Redeem::Valid { user_id })
}
