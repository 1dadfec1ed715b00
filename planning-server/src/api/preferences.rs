//! Shift preferences and the monthly submission deadline

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{ActivityCategory, DeadlineInfo, MonthYear, PreferenceUpsert, ShiftPreference};
use shared::util::date_in_month;

use crate::auth::CurrentUser;
use crate::db;
use crate::db::preferences::PreferenceRow;
use crate::error::internal;
use crate::scheduling::calendar::deadline_info;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, MonthQuery, audit};

fn validated(month: i32, year: i32) -> Result<MonthYear, AppError> {
    let my = MonthYear { month, year };
    my.validate().map_err(AppError::validation)?;
    Ok(my)
}

async fn current_deadline(state: &AppState, my: MonthYear) -> Result<DeadlineInfo, AppError> {
    let days = db::settings::deadline_days(&state.pool)
        .await
        .map_err(internal)?;
    deadline_info(my.month as u32, my.year, days, now_millis(), state.tz)
        .ok_or_else(|| AppError::validation("Invalid month"))
}

/// Staff edits close at the deadline; managers may still change things
async fn require_open_for(state: &AppState, user: &CurrentUser, my: MonthYear) -> Result<(), AppError> {
    if user.is_manager() {
        return Ok(());
    }
    let info = current_deadline(state, my).await?;
    ensure_window_open(user, &info)
}

fn ensure_window_open(user: &CurrentUser, info: &DeadlineInfo) -> Result<(), AppError> {
    if info.is_open || user.is_manager() {
        return Ok(());
    }
    Err(AppError::new(ErrorCode::PreferenceDeadlinePassed).with_detail("deadline", info.deadline))
}

/// Self, or a manager of the target's station
async fn require_access_to(state: &AppState, user: &CurrentUser, target_id: i64) -> Result<(), AppError> {
    if target_id == user.user_id {
        return Ok(());
    }
    user.require_manager()?;
    let target = db::users::find(&state.pool, target_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if target.station_id == user.station_id {
        return Ok(());
    }
    let cross_team = db::users::has_station_access(&state.pool, target_id, user.station_id)
        .await
        .map_err(internal)?;
    if cross_team {
        return Ok(());
    }
    user.require_station(target.station_id)
}

/// GET /api/preferences/{id}/{month}/{year}
pub async fn list_for_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path((id, month, year)): Path<(i64, i32, i32)>,
) -> ApiResult<Vec<ShiftPreference>> {
    let my = validated(month, year)?;
    require_access_to(&state, &user, id).await?;
    let prefs = db::preferences::list_for_user(&state.pool, id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(prefs))
}

/// GET /api/preferences/all?month&year
pub async fn list_all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<ShiftPreference>> {
    user.require_manager()?;
    let my = query.validated()?;
    let station_id = user.scoped_station(query.station_id);
    let prefs = db::preferences::list_for_station(&state.pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(prefs))
}

/// GET /api/preferences/deadline?month&year
pub async fn deadline(
    State(state): State<AppState>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<DeadlineInfo> {
    let my = query.validated()?;
    Ok(Json(current_deadline(&state, my).await?))
}

/// POST /api/preferences
pub async fn upsert(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<PreferenceUpsert>,
) -> ApiResult<ShiftPreference> {
    let my = validated(req.month, req.year)?;
    let target_id = req.user_id.unwrap_or(user.user_id);
    require_access_to(&state, &user, target_id).await?;

    if !date_in_month(req.date, my.month, my.year) {
        return Err(AppError::new(ErrorCode::PreferenceDateOutOfMonth));
    }
    if !req.preference_type.valid_for(req.shift_type) {
        return Err(AppError::invalid_field(
            "preference_type",
            "First and second half preferences only apply to night shifts",
        ));
    }
    require_open_for(&state, &user, my).await?;

    let notes = req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let pref = db::preferences::upsert(
        &state.pool,
        &PreferenceRow {
            user_id: target_id,
            station_id: user.station_id,
            date: req.date,
            shift_type: req.shift_type,
            preference_type: req.preference_type,
            month: my.month,
            year: my.year,
            notes,
        },
        now_millis(),
    )
    .await
    .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Preference,
        "Voorkeur opgeslagen",
        Some(format!(
            "user {target_id}: {} {:?} {:?}",
            pref.date, pref.shift_type, pref.preference_type
        )),
    )
    .await;
    Ok(Json(pref))
}

/// DELETE /api/preferences/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let pref = db::preferences::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::PreferenceNotFound))?;
    require_access_to(&state, &user, pref.user_id).await?;
    require_open_for(&state, &user, MonthYear { month: pref.month, year: pref.year }).await?;

    db::preferences::delete(&state.pool, id)
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Preference,
        "Voorkeur verwijderd",
        Some(format!("user {}: {}", pref.user_id, pref.date)),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// DELETE /api/preferences/clear-month/{id}/{month}/{year}
pub async fn clear_month(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path((id, month, year)): Path<(i64, i32, i32)>,
) -> ApiResult<serde_json::Value> {
    let my = validated(month, year)?;
    require_access_to(&state, &user, id).await?;
    require_open_for(&state, &user, my).await?;

    let removed = db::preferences::clear_month(&state.pool, id, my.month, my.year)
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Preference,
        "Voorkeuren gewist",
        Some(format!("user {id}: {month}/{year}, {removed} verwijderd")),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": removed })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::calendar::preference_deadline;
    use chrono_tz::Europe::Brussels;
    use shared::models::Role;

    fn session(role: Role) -> CurrentUser {
        CurrentUser {
            user_id: 3,
            station_id: 1,
            role,
        }
    }

    #[test]
    fn test_staff_locked_out_after_deadline() {
        let deadline = preference_deadline(4, 2025, 14, Brussels).unwrap();
        let before = deadline_info(4, 2025, 14, deadline - 1, Brussels).unwrap();
        let after = deadline_info(4, 2025, 14, deadline, Brussels).unwrap();

        let worker = session(Role::Ambulancier);
        assert!(ensure_window_open(&worker, &before).is_ok());
        let err = ensure_window_open(&worker, &after).unwrap_err();
        assert_eq!(err.code, ErrorCode::PreferenceDeadlinePassed);

        assert!(ensure_window_open(&session(Role::Admin), &after).is_ok());
        assert!(ensure_window_open(&session(Role::Supervisor), &after).is_ok());
    }
}
