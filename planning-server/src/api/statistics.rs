//! Monthly per-user statistics

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use shared::models::Overtime;

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::report::statistics::{StationStatistics, compute};
use crate::state::AppState;

use super::{ApiResult, MonthQuery};

/// GET /api/statistics?month&year
pub async fn monthly(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<StationStatistics> {
    user.require_manager()?;
    let my = query.validated()?;
    let station_id = user.scoped_station(query.station_id);
    let pool = &state.pool;

    let users = db::users::list_by_station(pool, station_id)
        .await
        .map_err(internal)?;
    let shifts = db::shifts::list_month(pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    let overtime: Vec<Overtime> =
        db::overtime::list_for_station(pool, station_id, my.month, my.year)
            .await
            .map_err(internal)?
            .into_iter()
            .map(|o| o.overtime)
            .collect();
    let preference_counts: HashMap<i64, i64> =
        db::preferences::count_by_user(pool, station_id, my.month, my.year)
            .await
            .map_err(internal)?
            .into_iter()
            .collect();

    Ok(Json(compute(
        my.month,
        my.year,
        &users,
        &shifts,
        &overtime,
        &preference_counts,
    )))
}
