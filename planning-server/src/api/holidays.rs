//! Holidays: global ones (supervisor) and station-specific ones (admin)

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{ActivityCategory, Holiday, HolidayCreate, HolidayUpdate};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, audit};

/// A manager may edit a holiday of their own station; global ones need a supervisor
fn require_holiday_scope(user: &CurrentUser, station_id: Option<i64>) -> Result<(), AppError> {
    user.require_manager()?;
    match station_id {
        Some(id) => user.require_station(id),
        None => user.require_supervisor(),
    }
}

/// GET /api/holidays
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Holiday>> {
    let holidays = db::holidays::list_for_station(&state.pool, user.station_id)
        .await
        .map_err(internal)?;
    Ok(Json(holidays))
}

/// POST /api/holidays
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<HolidayCreate>,
) -> ApiResult<Holiday> {
    require_holiday_scope(&user, req.station_id)?;
    if req.name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "Name is required"));
    }

    let holiday = db::holidays::create(&state.pool, &req, now_millis())
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Feestdag toegevoegd",
        Some(format!("{} {}", holiday.date, holiday.name)),
    )
    .await;
    Ok(Json(holiday))
}

/// PATCH /api/holidays/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<HolidayUpdate>,
) -> ApiResult<Holiday> {
    let existing = db::holidays::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::HolidayNotFound))?;
    require_holiday_scope(&user, existing.station_id)?;
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(AppError::invalid_field("name", "Name must not be empty"));
    }

    let holiday = db::holidays::update(&state.pool, id, &req)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::HolidayNotFound))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Feestdag bijgewerkt",
        Some(format!("{} {}", holiday.date, holiday.name)),
    )
    .await;
    Ok(Json(holiday))
}

/// DELETE /api/holidays/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let existing = db::holidays::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::HolidayNotFound))?;
    require_holiday_scope(&user, existing.station_id)?;

    db::holidays::delete(&state.pool, id)
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Feestdag verwijderd",
        Some(format!("{} {}", existing.date, existing.name)),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}
