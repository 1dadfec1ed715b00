//! Session endpoints: login, logout, station switch, password reset

use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{ActivityCategory, User};

use crate::auth::CurrentUser;
use crate::auth::rate_limit::FailureOutcome;
use crate::auth::user_auth::create_token;
use crate::db;
use crate::db::password_resets::Redeem;
use crate::error::internal;
use crate::state::AppState;
use crate::util::{
    generate_token, hash_password, normalize_username, now_millis, sha256_hex, validate_password,
    verify_password,
};

use super::{ApiResult, ClientMeta, audit};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub station_id: i64,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Whether `user` may open a session on `station_id`
async fn may_enter_station(state: &AppState, user: &User, station_id: i64) -> Result<bool, AppError> {
    if user.station_id == station_id || user.role.is_supervisor() {
        return Ok(true);
    }
    db::users::has_station_access(&state.pool, user.id, station_id)
        .await
        .map_err(internal)
}

/// POST /api/login
pub async fn login(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(req): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let username = normalize_username(&req.username);

    if let Err(minutes) = state
        .rate_limiter
        .check(&meta.ip, &username, req.station_id)
        .await
    {
        return Err(AppError::account_locked(minutes));
    }

    let station_exists = db::stations::find(&state.pool, req.station_id)
        .await
        .map_err(internal)?
        .is_some();

    let mut candidates = db::users::find_by_username(&state.pool, &username)
        .await
        .map_err(internal)?;
    // Home-station account first when the name exists in several stations
    candidates.sort_by_key(|u| (u.station_id != req.station_id, u.id));

    let mut authenticated = None;
    if station_exists {
        for user in candidates {
            if !user.is_active || !verify_password(&req.password, &user.password_hash) {
                continue;
            }
            if may_enter_station(&state, &user, req.station_id).await? {
                authenticated = Some(user);
                break;
            }
        }
    }

    let Some(user) = authenticated else {
        tracing::info!(username = %username, station_id = req.station_id, ip = %meta.ip, "Login failed");
        let outcome = state
            .rate_limiter
            .record_failure(&meta.ip, &username, req.station_id)
            .await;
        return Err(match outcome {
            FailureOutcome::Blocked(minutes) => AppError::account_locked(minutes),
            FailureOutcome::Remaining(left) => {
                AppError::invalid_credentials().with_detail("remaining_attempts", left)
            }
        });
    };

    state
        .rate_limiter
        .record_success(&meta.ip, &username, req.station_id)
        .await;

    let token = create_token(user.id, req.station_id, user.role, &state.jwt_secret).map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    let current = CurrentUser {
        user_id: user.id,
        station_id: req.station_id,
        role: user.role,
    };
    audit(&state, &meta, &current, ActivityCategory::Login, "Succesvol ingelogd", None).await;
    tracing::info!(user_id = user.id, station_id = req.station_id, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

/// POST /api/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
) -> ApiResult<serde_json::Value> {
    audit(&state, &meta, &user, ActivityCategory::Logout, "Uitgelogd", None).await;
    Ok(Json(serde_json::json!({ "message": "Logged out" })))
}

#[derive(Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    /// Station of the current session
    pub active_station_id: i64,
}

/// GET /api/user
pub async fn me(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<MeResponse> {
    let user = db::users::find(&state.pool, current.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(MeResponse {
        user,
        active_station_id: current.station_id,
    }))
}

#[derive(Deserialize)]
pub struct SwitchStationRequest {
    pub station_id: i64,
}

#[derive(Serialize)]
pub struct SwitchStationResponse {
    pub token: String,
    pub station_id: i64,
}

/// POST /api/auth/switch-station
pub async fn switch_station(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<SwitchStationRequest>,
) -> ApiResult<SwitchStationResponse> {
    let user = db::users::find(&state.pool, current.user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    db::stations::find(&state.pool, req.station_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;
    if !may_enter_station(&state, &user, req.station_id).await? {
        return Err(AppError::new(ErrorCode::StationAccessDenied));
    }

    let token = create_token(user.id, req.station_id, user.role, &state.jwt_secret).map_err(|e| {
        tracing::error!("JWT creation failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    audit(
        &state,
        &meta,
        &current,
        ActivityCategory::Login,
        "Station gewisseld",
        Some(format!("station_id={}", req.station_id)),
    )
    .await;

    Ok(Json(SwitchStationResponse {
        token,
        station_id: req.station_id,
    }))
}

// ── Password reset ──

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

const FORGOT_PASSWORD_REPLY: &str =
    "Als dit e-mailadres bekend is, is er een link verstuurd om het wachtwoord te herstellen";

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    let reply = Json(serde_json::json!({ "message": FORGOT_PASSWORD_REPLY }));

    // Same answer whether or not the address exists
    let user = match db::users::find_by_email(&state.pool, &req.email).await {
        Ok(Some(user)) => user,
        Ok(None) => return Ok(reply),
        Err(e) => {
            tracing::error!(error = %e, "Password reset lookup failed");
            return Ok(reply);
        }
    };
    let Some(email) = user.email.as_deref() else {
        return Ok(reply);
    };

    let token = generate_token();
    if let Err(e) =
        db::password_resets::create(&state.pool, user.id, &sha256_hex(&token), now_millis()).await
    {
        tracing::error!(user_id = user.id, error = %e, "Failed to store reset token");
        return Ok(reply);
    }

    let link = format!("{}/reset-password?token={token}", state.public_base_url);
    if let Err(e) = state.email.send_password_reset(email, &link).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to send password reset email");
    }

    Ok(reply)
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    meta: ClientMeta,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<serde_json::Value> {
    validate_password(&req.password)?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        tracing::error!("Password hashing failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })?;

    let outcome = db::password_resets::redeem(
        &state.pool,
        &sha256_hex(req.token.trim()),
        &password_hash,
        now_millis(),
    )
    .await
    .map_err(internal)?;

    match outcome {
        Redeem::Valid { user_id } => {
            db::activity::log_activity(
                &state.pool,
                &db::activity::ActivityContext {
                    user_id: Some(user_id),
                    ..meta.context(None)
                },
                ActivityCategory::Profile,
                "Wachtwoord hersteld",
                None,
            )
            .await;
            Ok(Json(serde_json::json!({ "message": "Password updated" })))
        }
        Redeem::Expired => Err(AppError::new(ErrorCode::ResetTokenExpired)),
        Redeem::Unknown => Err(AppError::new(ErrorCode::ResetTokenInvalid)),
    }
}
