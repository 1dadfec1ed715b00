//! Monthly schedule generation and publication

use std::collections::HashSet;

use axum::{Extension, Json, extract::State};
use serde::Serialize;
use shared::error::AppError;
use shared::models::ActivityCategory;

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::notify::messages;
use crate::scheduling::calendar::month_bounds;
use crate::scheduling::{Candidate, GenerationSummary, GeneratorInput, generate_schedule, summarize};
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, MonthQuery, audit};

/// POST /api/schedule/generate
///
/// Replaces the station's month with a freshly generated plan.
pub async fn generate(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<MonthQuery>,
) -> ApiResult<GenerationSummary> {
    user.require_manager()?;
    let my = req.validated()?;
    let station_id = user.scoped_station(req.station_id);
    let month = my.month as u32;
    let (first, last) =
        month_bounds(month, my.year).ok_or_else(|| AppError::validation("Invalid month"))?;

    let pool = &state.pool;
    // Supervisors work across stations and are not planned
    let candidates: Vec<Candidate> = db::users::list_active_by_station(pool, station_id)
        .await
        .map_err(internal)?
        .into_iter()
        .filter(|u| !u.role.is_supervisor())
        .map(|u| Candidate {
            user_id: u.id,
            max_hours: u.max_hours,
        })
        .collect();
    let preferences = db::preferences::list_for_station(pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    let weekday_configs = db::weekday_configs::list(pool, station_id)
        .await
        .map_err(internal)?;
    let holidays: HashSet<_> = db::holidays::active_dates(pool, station_id, first, last)
        .await
        .map_err(internal)?
        .into_iter()
        .collect();

    let plan = generate_schedule(&GeneratorInput {
        month,
        year: my.year,
        users: &candidates,
        preferences: &preferences,
        weekday_configs: &weekday_configs,
        holidays: &holidays,
        tz: state.tz,
    });
    let summary = summarize(&plan);

    db::shifts::replace_month(pool, station_id, my.month, my.year, &plan, now_millis())
        .await
        .map_err(internal)?;

    tracing::info!(
        station_id,
        month = my.month,
        year = my.year,
        total = summary.total,
        open = summary.open,
        "Schedule generated"
    );
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Planning gegenereerd",
        Some(format!(
            "{}/{}: {} shifts, {} open",
            my.month, my.year, summary.total, summary.open
        )),
    )
    .await;
    Ok(Json(summary))
}

#[derive(Serialize)]
pub struct PublishResponse {
    pub recipients: usize,
}

/// POST /api/schedule/publish
pub async fn publish(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<MonthQuery>,
) -> ApiResult<PublishResponse> {
    user.require_manager()?;
    let my = req.validated()?;
    let station_id = user.scoped_station(req.station_id);

    let user_ids: Vec<i64> = db::users::list_active_by_station(&state.pool, station_id)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|u| u.id)
        .collect();
    let recipients = user_ids.len();
    state
        .notifier
        .spawn_notify(user_ids, messages::planning_published(my.month as u32, my.year));

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Planning gepubliceerd",
        Some(format!("{}/{}", my.month, my.year)),
    )
    .await;
    Ok(Json(PublishResponse { recipients }))
}
