//! Weekday generation settings of the active station

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::AppError;
use shared::models::{ActivityCategory, WeekdayConfig, WeekdayConfigUpdate};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::{ApiResult, ClientMeta, StationQuery, audit};

const MAX_SHIFT_COUNT: i32 = 10;

/// GET /api/weekday-configs
///
/// Days without a stored row are reported with their defaults.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<WeekdayConfig>> {
    let station_id = user.scoped_station(query.station_id);
    let stored = db::weekday_configs::list(&state.pool, station_id)
        .await
        .map_err(internal)?;
    let configs = (0..7)
        .map(|day| {
            stored
                .iter()
                .find(|c| c.day_of_week == day)
                .cloned()
                .unwrap_or_else(|| WeekdayConfig::default_for(station_id, day))
        })
        .collect();
    Ok(Json(configs))
}

/// POST /api/weekday-configs/initialize
pub async fn initialize(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<WeekdayConfig>> {
    user.require_manager()?;
    let station_id = user.scoped_station(query.station_id);
    let configs = db::weekday_configs::initialize(&state.pool, station_id)
        .await
        .map_err(internal)?;
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Weekdaginstellingen geïnitialiseerd",
        Some(format!("station_id={station_id}")),
    )
    .await;
    Ok(Json(configs))
}

/// PUT /api/weekday-configs/{day}
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(day): Path<i32>,
    Query(query): Query<StationQuery>,
    Json(req): Json<WeekdayConfigUpdate>,
) -> ApiResult<WeekdayConfig> {
    user.require_manager()?;
    if !(0..7).contains(&day) {
        return Err(AppError::invalid_field("day_of_week", "Day must be 0 (Sunday) to 6"));
    }
    for (field, count) in [
        ("day_shift_count", req.day_shift_count),
        ("night_shift_count", req.night_shift_count),
    ] {
        if count.is_some_and(|c| !(0..=MAX_SHIFT_COUNT).contains(&c)) {
            return Err(AppError::invalid_field(
                field,
                format!("{field} must be between 0 and {MAX_SHIFT_COUNT}"),
            ));
        }
    }

    let station_id = user.scoped_station(query.station_id);
    let config = db::weekday_configs::update(&state.pool, station_id, day, &req)
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Weekdaginstelling bijgewerkt",
        Some(format!("station_id={station_id} dag={day}")),
    )
    .await;
    Ok(Json(config))
}
