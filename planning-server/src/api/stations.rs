//! Station CRUD and per-station settings

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivityCategory, Station, StationCreate, StationDependencies, StationUpdate,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::stations::{SETTING_KIOSK_TOKEN, SETTING_SHIFT_SWAPS_ENABLED};
use crate::error::{internal, map_unique};
use crate::state::AppState;
use crate::util::{generate_token, now_millis};

use super::{ApiResult, ClientMeta, audit};

#[derive(Serialize)]
pub struct PublicStation {
    pub id: i64,
    pub display_name: String,
}

/// GET /api/stations/public
///
/// Login screen station picker.
pub async fn list_public(State(state): State<AppState>) -> ApiResult<Vec<PublicStation>> {
    let stations = db::stations::list(&state.pool).await.map_err(internal)?;
    Ok(Json(
        stations
            .into_iter()
            .map(|s| PublicStation {
                id: s.id,
                display_name: s.display_name,
            })
            .collect(),
    ))
}

/// GET /api/stations
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<Station>> {
    let stations = db::stations::list(&state.pool).await.map_err(internal)?;
    if user.is_supervisor() {
        return Ok(Json(stations));
    }
    Ok(Json(
        stations
            .into_iter()
            .filter(|s| s.id == user.station_id)
            .collect(),
    ))
}

fn validate_station_fields(name: &str, code: &str, display_name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::invalid_field("name", "Name is required"));
    }
    if code.trim().is_empty() {
        return Err(AppError::invalid_field("code", "Code is required"));
    }
    if display_name.trim().is_empty() {
        return Err(AppError::invalid_field("display_name", "Display name is required"));
    }
    Ok(())
}

/// POST /api/stations
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<StationCreate>,
) -> ApiResult<Station> {
    user.require_supervisor()?;
    validate_station_fields(&req.name, &req.code, &req.display_name)?;

    let station = db::stations::create(&state.pool, &req, now_millis())
        .await
        .map_err(|e| map_unique(e, ErrorCode::StationNameExists))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Station aangemaakt",
        Some(station.name.clone()),
    )
    .await;
    Ok(Json(station))
}

/// PUT /api/stations/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<StationUpdate>,
) -> ApiResult<Station> {
    user.require_supervisor()?;
    for (field, value) in [
        ("name", &req.name),
        ("code", &req.code),
        ("display_name", &req.display_name),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::invalid_field(field, format!("{field} must not be empty")));
        }
    }

    let station = db::stations::update(&state.pool, id, &req)
        .await
        .map_err(|e| map_unique(e, ErrorCode::StationNameExists))?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Station bijgewerkt",
        Some(station.name.clone()),
    )
    .await;
    Ok(Json(station))
}

/// GET /api/stations/{id}/dependencies
pub async fn dependencies(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<StationDependencies> {
    user.require_supervisor()?;
    let deps = db::stations::dependencies(&state.pool, id)
        .await
        .map_err(internal)?;
    Ok(Json(deps))
}

#[derive(Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub force: bool,
}

/// DELETE /api/stations/{id}?force=true
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<serde_json::Value> {
    user.require_supervisor()?;

    if !query.force {
        let deps = db::stations::dependencies(&state.pool, id)
            .await
            .map_err(internal)?;
        if !deps.is_empty() {
            return Err(AppError::new(ErrorCode::StationHasDependencies)
                .with_detail("users", deps.users)
                .with_detail("shifts", deps.shifts)
                .with_detail("preferences", deps.preferences));
        }
    }

    if !db::stations::delete(&state.pool, id, query.force)
        .await
        .map_err(internal)?
    {
        return Err(AppError::new(ErrorCode::StationNotFound));
    }

    tracing::info!(station_id = id, force = query.force, "Station deleted");
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Station verwijderd",
        Some(format!("station_id={id} force={}", query.force)),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

#[derive(Serialize)]
pub struct KioskToken {
    pub token: String,
}

/// POST /api/stations/{id}/kiosk-token
///
/// Issues a fresh kiosk token; the previous link stops working.
pub async fn rotate_kiosk_token(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<KioskToken> {
    user.require_manager()?;
    user.require_station(id)?;
    db::stations::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;

    let token = generate_token();
    db::stations::set_setting(&state.pool, id, SETTING_KIOSK_TOKEN, &token, now_millis())
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Kiosk-link vernieuwd",
        Some(format!("station_id={id}")),
    )
    .await;
    Ok(Json(KioskToken { token }))
}

#[derive(Serialize, Deserialize)]
pub struct SwapsEnabled {
    pub enabled: bool,
}

/// GET /api/station-settings/{id}/shift-swaps-enabled
pub async fn get_swaps_enabled(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<SwapsEnabled> {
    user.require_station(id)?;
    let enabled = db::stations::shift_swaps_enabled(&state.pool, id)
        .await
        .map_err(internal)?;
    Ok(Json(SwapsEnabled { enabled }))
}

/// PUT /api/station-settings/{id}/shift-swaps-enabled
pub async fn set_swaps_enabled(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<SwapsEnabled>,
) -> ApiResult<SwapsEnabled> {
    user.require_manager()?;
    user.require_station(id)?;

    db::stations::set_setting(
        &state.pool,
        id,
        SETTING_SHIFT_SWAPS_ENABLED,
        if req.enabled { "true" } else { "false" },
        now_millis(),
    )
    .await
    .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        if req.enabled {
            "Ruilen van diensten ingeschakeld"
        } else {
            "Ruilen van diensten uitgeschakeld"
        },
        Some(format!("station_id={id}")),
    )
    .await;
    Ok(Json(SwapsEnabled {
        enabled: req.enabled,
    }))
}
