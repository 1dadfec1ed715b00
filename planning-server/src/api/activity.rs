//! Activity log browsing

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use shared::models::{ActivityLog, ActivityLogQuery, Paginated};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::state::AppState;

use super::ApiResult;

/// GET /api/activity-logs
///
/// Admins only see their own station; supervisors may filter on any station
/// or leave it out to see everything.
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(mut query): Query<ActivityLogQuery>,
) -> ApiResult<Paginated<ActivityLog>> {
    user.require_manager()?;
    if !user.is_supervisor() {
        query.station_id = Some(user.station_id);
    }
    let page = db::activity::query(&state.pool, &query)
        .await
        .map_err(internal)?;
    Ok(Json(page))
}
