//! User management, personal settings and cross-team access

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivityCategory, DisplaySettingsUpdate, HourPreferencesUpdate, PasswordChange, Role, Station,
    User, UserCreate, UserUpdate, validate_hour_limits,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::users::NewUser;
use crate::error::{internal, map_unique};
use crate::state::AppState;
use crate::util::{hash_password, normalize_username, now_millis, validate_password, verify_password};

use super::{ApiResult, ClientMeta, StationQuery, audit};

/// Upper bound for the self-service hour preferences
const MAX_SELF_SERVICE_HOURS: i32 = 168;
const MAX_REMINDER_HOURS: i32 = 48;

async fn load_user(state: &AppState, id: i64) -> Result<User, AppError> {
    db::users::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))
}

/// Admins manage users of their station, supervisors everyone
fn require_manages(current: &CurrentUser, target: &User) -> Result<(), AppError> {
    current.require_manager()?;
    current.require_station(target.station_id)?;
    if target.role.is_supervisor() && !current.is_supervisor() {
        return Err(AppError::supervisor_required());
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, AppError> {
    hash_password(password).map_err(|e| {
        tracing::error!("Password hashing failed: {e}");
        AppError::new(ErrorCode::InternalError)
    })
}

fn hours_error(msg: String) -> AppError {
    AppError::with_message(ErrorCode::UserInvalidHours, msg)
}

/// GET /api/users
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<User>> {
    let station_id = user.scoped_station(query.station_id);
    let users = if user.is_manager() {
        db::users::list_by_station(&state.pool, station_id).await
    } else {
        db::users::list_active_by_station(&state.pool, station_id).await
    }
    .map_err(internal)?;
    Ok(Json(users))
}

/// GET /api/users/all
pub async fn list_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<User>> {
    user.require_supervisor()?;
    let users = db::users::list_all(&state.pool).await.map_err(internal)?;
    Ok(Json(users))
}

/// POST /api/users
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<UserCreate>,
) -> ApiResult<User> {
    user.require_manager()?;

    let role = req.role.unwrap_or(Role::Ambulancier);
    if role.is_supervisor() {
        user.require_supervisor()?;
    }
    let station_id = user.scoped_station(req.station_id);
    db::stations::find(&state.pool, station_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;

    let username = normalize_username(&req.username);
    if username.is_empty() {
        return Err(AppError::invalid_field("username", "Username is required"));
    }
    if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
        return Err(AppError::invalid_field("first_name", "First and last name are required"));
    }
    validate_password(&req.password)?;

    let min_hours = req.min_hours.unwrap_or(0);
    let preferred_hours = req.preferred_hours.unwrap_or(min_hours);
    let max_hours = req.max_hours.unwrap_or(preferred_hours.max(24));
    validate_hour_limits(min_hours, preferred_hours, max_hours).map_err(hours_error)?;

    let password_hash = hash(&req.password)?;
    let email = req
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty());

    let created = db::users::create(
        &state.pool,
        &NewUser {
            station_id,
            username: &username,
            password_hash: &password_hash,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            email,
            role,
            min_hours,
            max_hours,
            preferred_hours,
        },
        now_millis(),
    )
    .await
    .map_err(|e| map_unique(e, ErrorCode::UsernameExists))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::UserManagement,
        "Gebruiker aangemaakt",
        Some(format!("{} ({})", created.username, created.role.as_str())),
    )
    .await;
    Ok(Json(created))
}

/// PATCH /api/users/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(mut req): Json<UserUpdate>,
) -> ApiResult<User> {
    let target = load_user(&state, id).await?;
    require_manages(&user, &target)?;

    if req.role.is_some_and(|r| r.is_supervisor()) || req.station_id.is_some() {
        user.require_supervisor()?;
    }
    if id == user.user_id && req.is_active == Some(false) {
        return Err(AppError::validation("You cannot deactivate your own account"));
    }
    if let Some(username) = req.username.as_deref() {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AppError::invalid_field("username", "Username must not be empty"));
        }
        req.username = Some(username);
    }

    validate_hour_limits(
        req.min_hours.unwrap_or(target.min_hours),
        req.preferred_hours.unwrap_or(target.preferred_hours),
        req.max_hours.unwrap_or(target.max_hours),
    )
    .map_err(hours_error)?;

    let updated = db::users::update(&state.pool, id, &req, now_millis())
        .await
        .map_err(|e| map_unique(e, ErrorCode::UsernameExists))?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::UserManagement,
        "Gebruiker bijgewerkt",
        Some(updated.username.clone()),
    )
    .await;
    Ok(Json(updated))
}

/// DELETE /api/users/{id}
///
/// Shifts from now on become open again.
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    if id == user.user_id {
        return Err(AppError::new(ErrorCode::UserCannotDeleteSelf));
    }
    let target = load_user(&state, id).await?;
    require_manages(&user, &target)?;

    let now = now_millis();
    if !db::users::delete(&state.pool, id, now, now)
        .await
        .map_err(internal)?
    {
        return Err(AppError::new(ErrorCode::UserNotFound));
    }

    tracing::info!(user_id = id, deleted_by = user.user_id, "User deleted");
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::UserManagement,
        "Gebruiker verwijderd",
        Some(format!("{} ({})", target.username, target.full_name())),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// PATCH /api/users/{id}/preferences
pub async fn update_hour_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<HourPreferencesUpdate>,
) -> ApiResult<User> {
    let target = load_user(&state, id).await?;
    if id != user.user_id {
        require_manages(&user, &target)?;
    }

    if !(0..=MAX_SELF_SERVICE_HOURS).contains(&req.max_hours)
        || !(0..=MAX_SELF_SERVICE_HOURS).contains(&req.preferred_hours)
    {
        return Err(hours_error(format!(
            "Hours must be between 0 and {MAX_SELF_SERVICE_HOURS}"
        )));
    }
    validate_hour_limits(target.min_hours, req.preferred_hours, req.max_hours)
        .map_err(hours_error)?;

    let updated =
        db::users::set_hour_preferences(&state.pool, id, req.max_hours, req.preferred_hours, now_millis())
            .await
            .map_err(internal)?
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Profile,
        "Urenvoorkeur bijgewerkt",
        Some(format!(
            "max={} voorkeur={}",
            updated.max_hours, updated.preferred_hours
        )),
    )
    .await;
    Ok(Json(updated))
}

/// PATCH /api/users/{id}/display-settings
pub async fn update_display_settings(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<DisplaySettingsUpdate>,
) -> ApiResult<User> {
    if id != user.user_id {
        return Err(AppError::permission_denied("Display settings are personal"));
    }
    if req
        .shift_reminder_hours
        .is_some_and(|h| !(0..=MAX_REMINDER_HOURS).contains(&h))
    {
        return Err(AppError::invalid_field(
            "shift_reminder_hours",
            format!("Reminder must be between 0 and {MAX_REMINDER_HOURS} hours"),
        ));
    }

    let updated = db::users::set_display_settings(
        &state.pool,
        id,
        req.dark_mode,
        req.shift_reminder_hours,
        now_millis(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    Ok(Json(updated))
}

/// PATCH /api/users/{id}/password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<PasswordChange>,
) -> ApiResult<serde_json::Value> {
    let target = load_user(&state, id).await?;
    if id == user.user_id {
        let current = req.current_password.as_deref().unwrap_or_default();
        if !verify_password(current, &target.password_hash) {
            return Err(AppError::invalid_field(
                "current_password",
                "Current password is incorrect",
            ));
        }
    } else {
        require_manages(&user, &target)?;
    }
    validate_password(&req.new_password)?;

    let password_hash = hash(&req.new_password)?;
    db::users::set_password(&state.pool, id, &password_hash, now_millis())
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        if id == user.user_id {
            ActivityCategory::Profile
        } else {
            ActivityCategory::UserManagement
        },
        "Wachtwoord gewijzigd",
        Some(target.username),
    )
    .await;
    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

/// GET /api/users/{id}/accessible-stations
pub async fn accessible_stations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Station>> {
    user.require_self_or_manager(id)?;
    let target = load_user(&state, id).await?;
    let stations = db::users::accessible_stations(&state.pool, &target)
        .await
        .map_err(internal)?;
    Ok(Json(stations))
}

/// POST /api/users/{id}/station-access/{station_id}
pub async fn grant_station_access(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path((id, station_id)): Path<(i64, i64)>,
) -> ApiResult<serde_json::Value> {
    user.require_supervisor()?;
    let target = load_user(&state, id).await?;
    db::stations::find(&state.pool, station_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;
    if target.station_id == station_id {
        return Err(AppError::validation("This is already the user's home station"));
    }

    db::users::grant_station_access(&state.pool, id, station_id, now_millis())
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::UserManagement,
        "Stationtoegang verleend",
        Some(format!("{} -> station {station_id}", target.username)),
    )
    .await;
    Ok(Json(serde_json::json!({ "granted": true })))
}

/// DELETE /api/users/{id}/station-access/{station_id}
pub async fn revoke_station_access(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path((id, station_id)): Path<(i64, i64)>,
) -> ApiResult<serde_json::Value> {
    user.require_supervisor()?;
    let revoked = db::users::revoke_station_access(&state.pool, id, station_id)
        .await
        .map_err(internal)?;
    if revoked {
        audit(
            &state,
            &meta,
            &user,
            ActivityCategory::UserManagement,
            "Stationtoegang ingetrokken",
            Some(format!("user {id} -> station {station_id}")),
        )
        .await;
    }
    Ok(Json(serde_json::json!({ "revoked": revoked })))
}
