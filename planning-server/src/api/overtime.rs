//! Overtime registration

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivityCategory, MonthYear, Overtime, OvertimeCreate, OvertimeUpdate, OvertimeWithUser,
    validate_overtime,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::overtime::NewOvertime;
use crate::error::internal;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, audit};

fn month_year(month: i32, year: i32) -> Result<MonthYear, AppError> {
    let my = MonthYear { month, year };
    my.validate().map_err(AppError::validation)?;
    Ok(my)
}

/// Loads an entry the caller owns, or one of a station the caller manages
async fn load_editable(state: &AppState, user: &CurrentUser, id: i64) -> Result<Overtime, AppError> {
    let entry = db::overtime::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::OvertimeNotFound))?;
    if entry.user_id != user.user_id {
        user.require_manager()?;
        user.require_station(entry.station_id)?;
    }
    Ok(entry)
}

/// POST /api/overtime
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<OvertimeCreate>,
) -> ApiResult<Overtime> {
    validate_overtime(req.duration_minutes, &req.reason).map_err(AppError::validation)?;
    let shift = db::shifts::find(&state.pool, req.shift_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ShiftNotFound))?;
    if shift.user_id != Some(user.user_id) {
        return Err(AppError::new(ErrorCode::ShiftNotOwned));
    }

    let entry = db::overtime::create(
        &state.pool,
        &NewOvertime {
            user_id: user.user_id,
            shift_id: shift.id,
            station_id: shift.station_id,
            date: req.date,
            start_time: req.start_time,
            duration_minutes: req.duration_minutes,
            reason: req.reason.trim(),
        },
        now_millis(),
    )
    .await
    .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Overtime,
        "Overuren geregistreerd",
        Some(format!(
            "{} min op {} (shift {})",
            entry.duration_minutes, entry.date, shift.id
        )),
    )
    .await;
    Ok(Json(entry))
}

/// PATCH /api/overtime/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<OvertimeUpdate>,
) -> ApiResult<Overtime> {
    let existing = load_editable(&state, &user, id).await?;

    let date = req.date.unwrap_or(existing.date);
    let start_time = req.start_time.unwrap_or(existing.start_time);
    let duration_minutes = req.duration_minutes.unwrap_or(existing.duration_minutes);
    let reason = req.reason.as_deref().unwrap_or(&existing.reason).trim();
    validate_overtime(duration_minutes, reason).map_err(AppError::validation)?;

    let updated = db::overtime::update(
        &state.pool,
        id,
        date,
        start_time,
        duration_minutes,
        reason,
        now_millis(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::OvertimeNotFound))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Overtime,
        "Overuren bijgewerkt",
        Some(format!(
            "{id}: {} -> {} min",
            existing.duration_minutes, updated.duration_minutes
        )),
    )
    .await;
    Ok(Json(updated))
}

/// DELETE /api/overtime/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let existing = load_editable(&state, &user, id).await?;
    db::overtime::delete(&state.pool, id)
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Overtime,
        "Overuren verwijderd",
        Some(format!(
            "{} min op {} (user {})",
            existing.duration_minutes, existing.date, existing.user_id
        )),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /api/overtime/my/{year}/{month}
pub async fn list_my(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((year, month)): Path<(i32, i32)>,
) -> ApiResult<Vec<Overtime>> {
    let my = month_year(month, year)?;
    let entries = db::overtime::list_for_user(&state.pool, user.user_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}

/// GET /api/overtime/station/{station_id}/{year}/{month}
pub async fn list_station(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((station_id, year, month)): Path<(i64, i32, i32)>,
) -> ApiResult<Vec<OvertimeWithUser>> {
    user.require_manager()?;
    user.require_station(station_id)?;
    let my = month_year(month, year)?;
    let entries = db::overtime::list_for_station(&state.pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(entries))
}
