//! Shift listing, manual edits, emergency scheduling and CSV export

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{ActivityCategory, EmergencyAssign, Shift, ShiftCreate, ShiftUpdate, User};
use shared::util::dutch_month_name_capitalized;

use crate::auth::CurrentUser;
use crate::db;
use crate::db::shifts::{NewShift, ShiftChanges};
use crate::error::internal;
use crate::notify::messages;
use crate::report::{ReportInput, station_sheet};
use crate::scheduling::calendar::{format_local, local_date};
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, MonthQuery, audit};

async fn load_shift(state: &AppState, id: i64) -> Result<Shift, AppError> {
    db::shifts::find(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ShiftNotFound))
}

/// The user must exist and be active
async fn load_assignee(state: &AppState, user_id: i64) -> Result<User, AppError> {
    db::users::find(&state.pool, user_id)
        .await
        .map_err(internal)?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))
}

/// An assignee of `station_id`'s shifts: active, and either based there or
/// granted cross-team access
async fn load_station_assignee(
    state: &AppState,
    user_id: i64,
    station_id: i64,
) -> Result<User, AppError> {
    let assignee = load_assignee(state, user_id).await?;
    let has_access = assignee.station_id != station_id
        && db::users::has_station_access(&state.pool, assignee.id, station_id)
            .await
            .map_err(internal)?;
    ensure_works_at(&assignee, station_id, has_access)?;
    Ok(assignee)
}

fn ensure_works_at(assignee: &User, station_id: i64, has_access: bool) -> Result<(), AppError> {
    if assignee.station_id == station_id || has_access {
        Ok(())
    } else {
        Err(AppError::invalid_field(
            "user_id",
            "User does not work at this station",
        ))
    }
}

fn validate_times(start: i64, end: i64) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::new(ErrorCode::ShiftInvalidTimes));
    }
    Ok(())
}

/// `date` is the local calendar day the shift starts on
fn validate_shift_date(date: NaiveDate, start: i64, tz: Tz) -> Result<(), AppError> {
    if local_date(start, tz) != Some(date) {
        return Err(AppError::invalid_field(
            "date",
            "Date must be the day the shift starts",
        ));
    }
    Ok(())
}

fn shift_label(state: &AppState, shift: &Shift) -> String {
    format_local(shift.start_time, state.tz, "%d-%m-%Y %H:%M")
}

/// GET /api/shifts?month&year
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<Shift>> {
    let my = query.validated()?;
    let station_id = user.scoped_station(query.station_id);
    let shifts = db::shifts::list_month(&state.pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(shifts))
}

/// GET /api/shifts/open?month&year
pub async fn list_open(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<Shift>> {
    let my = query.validated()?;
    let station_id = user.scoped_station(query.station_id);
    let shifts = db::shifts::list_open(&state.pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(shifts))
}

/// GET /api/shifts/my?month&year
pub async fn list_my(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> ApiResult<Vec<Shift>> {
    let my = query.validated()?;
    let shifts = db::shifts::list_for_user(&state.pool, user.user_id, my.month, my.year)
        .await
        .map_err(internal)?;
    Ok(Json(shifts))
}

/// GET /api/shifts/export?month&year
///
/// Semicolon-separated CSV of the station's month.
pub async fn export(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<MonthQuery>,
) -> Result<Response, AppError> {
    user.require_manager()?;
    let my = query.validated()?;
    let station_id = user.scoped_station(query.station_id);

    let station = db::stations::find(&state.pool, station_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::StationNotFound))?;
    let shifts = db::shifts::list_month(&state.pool, station_id, my.month, my.year)
        .await
        .map_err(internal)?;
    let user_names: HashMap<i64, String> = db::users::list_by_station(&state.pool, station_id)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|u| (u.id, u.full_name()))
        .collect();

    let stations = [station];
    let input = ReportInput {
        month: my.month as u32,
        year: my.year,
        stations: &stations,
        shifts: &shifts,
        overtime: &[],
        user_names: &user_names,
        excluded_stations: &[],
        tz: state.tz,
    };
    let body = station_sheet(&input, &stations[0]).to_csv();
    let filename = format!(
        "Planning_{}_{}_{}.csv",
        stations[0].code,
        dutch_month_name_capitalized(my.month as u32),
        my.year
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// POST /api/shifts
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<ShiftCreate>,
) -> ApiResult<Shift> {
    user.require_manager()?;
    validate_times(req.start_time, req.end_time)?;
    validate_shift_date(req.date, req.start_time, state.tz)?;
    if let Some(user_id) = req.user_id {
        load_station_assignee(&state, user_id, user.station_id).await?;
    }

    let shift = db::shifts::create(
        &state.pool,
        &NewShift {
            station_id: user.station_id,
            user_id: req.user_id,
            date: req.date,
            start_time: req.start_time,
            end_time: req.end_time,
            shift_type: req.shift_type,
            is_split_shift: req.is_split_shift,
        },
        now_millis(),
    )
    .await
    .map_err(internal)?;

    if let Some(user_id) = shift.user_id {
        state
            .notifier
            .spawn_notify(vec![user_id], messages::shift_changed(&shift_label(&state, &shift), true));
    }
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Shift aangemaakt",
        Some(format!("shift {} op {}", shift.id, shift.date)),
    )
    .await;
    Ok(Json(shift))
}

/// PATCH /api/shifts/{id}
///
/// `user_id: null` unassigns, an absent `user_id` keeps the assignee.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<ShiftUpdate>,
) -> ApiResult<Shift> {
    user.require_manager()?;
    let existing = load_shift(&state, id).await?;
    user.require_station(existing.station_id)?;

    let changes = ShiftChanges {
        user_id: req.user_id.unwrap_or(existing.user_id),
        start_time: req.start_time.unwrap_or(existing.start_time),
        end_time: req.end_time.unwrap_or(existing.end_time),
        shift_type: req.shift_type.unwrap_or(existing.shift_type),
        is_split_shift: req.is_split_shift.unwrap_or(existing.is_split_shift),
    };
    validate_times(changes.start_time, changes.end_time)?;
    validate_shift_date(existing.date, changes.start_time, state.tz)?;
    if let Some(user_id) = changes.user_id
        && Some(user_id) != existing.user_id
    {
        load_station_assignee(&state, user_id, existing.station_id).await?;
    }

    let updated = db::shifts::update(&state.pool, id, &changes, now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ShiftNotFound))?;

    let label = shift_label(&state, &updated);
    let times_changed =
        updated.start_time != existing.start_time || updated.end_time != existing.end_time;
    if existing.user_id != updated.user_id {
        if let Some(old) = existing.user_id {
            state
                .notifier
                .spawn_notify(vec![old], messages::shift_changed(&shift_label(&state, &existing), false));
        }
        if let Some(new) = updated.user_id {
            state
                .notifier
                .spawn_notify(vec![new], messages::shift_changed(&label, true));
        }
    } else if let Some(current) = updated.user_id
        && (times_changed || updated.shift_type != existing.shift_type)
    {
        state
            .notifier
            .spawn_notify(vec![current], messages::shift_changed(&label, false));
    }

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Shift bijgewerkt",
        Some(format!(
            "shift {id}: {:?} -> {:?}",
            existing.user_id, updated.user_id
        )),
    )
    .await;
    Ok(Json(updated))
}

/// DELETE /api/shifts/{id}
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    user.require_manager()?;
    let existing = load_shift(&state, id).await?;
    user.require_station(existing.station_id)?;

    db::shifts::delete(&state.pool, id)
        .await
        .map_err(internal)?;

    if let Some(user_id) = existing.user_id {
        state.notifier.spawn_notify(
            vec![user_id],
            messages::shift_changed(&shift_label(&state, &existing), false),
        );
    }
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Shift verwijderd",
        Some(format!("shift {id} op {}", existing.date)),
    )
    .await;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/shifts/{id}/emergency-assign
///
/// Fills an open shift without checking preferences or hour limits.
pub async fn emergency_assign(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<EmergencyAssign>,
) -> ApiResult<Shift> {
    user.require_manager()?;
    let reason = req.reason.trim();
    if reason.is_empty() {
        return Err(AppError::invalid_field("reason", "A reason is required"));
    }
    let existing = load_shift(&state, id).await?;
    user.require_station(existing.station_id)?;
    let assignee = load_station_assignee(&state, req.user_id, existing.station_id).await?;

    let shift = db::shifts::emergency_assign(&state.pool, id, assignee.id, reason, now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ShiftNotOpen))?;

    state.notifier.spawn_notify(
        vec![assignee.id],
        messages::shift_changed(&shift_label(&state, &shift), true),
    );
    tracing::info!(shift_id = id, user_id = assignee.id, "Emergency assignment");
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Noodinplanning",
        Some(format!("shift {id} -> {}: {reason}", assignee.full_name())),
    )
    .await;
    Ok(Json(shift))
}

#[derive(Deserialize)]
pub struct CandidatesQuery {
    pub shift_id: i64,
}

/// GET /api/emergency-scheduling/users?shift_id
pub async fn emergency_candidates(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<CandidatesQuery>,
) -> ApiResult<Vec<User>> {
    user.require_manager()?;
    let shift = load_shift(&state, query.shift_id).await?;
    user.require_station(shift.station_id)?;
    let users = db::shifts::available_users(
        &state.pool,
        shift.station_id,
        shift.start_time,
        shift.end_time,
    )
    .await
    .map_err(internal)?;
    Ok(Json(users))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduling::calendar::local_to_millis;
    use chrono_tz::Europe::Brussels;
    use shared::models::Role;

    fn user(station_id: i64) -> User {
        User {
            id: 4,
            station_id,
            username: "jan".into(),
            password_hash: String::new(),
            first_name: "Jan".into(),
            last_name: "Peeters".into(),
            email: None,
            role: Role::Ambulancier,
            is_active: true,
            min_hours: 0,
            max_hours: 160,
            preferred_hours: 120,
            dark_mode: false,
            shift_reminder_hours: 12,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_assignee_must_work_at_station() {
        assert!(ensure_works_at(&user(1), 1, false).is_ok());
        assert!(ensure_works_at(&user(2), 1, true).is_ok());
        let err = ensure_works_at(&user(2), 1, false).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_shift_date_matches_local_start() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        let night = local_to_millis(date, 23, 0, Brussels);
        assert!(validate_shift_date(date, night, Brussels).is_ok());
        let next = date.succ_opt().unwrap();
        assert!(validate_shift_date(next, night, Brussels).is_err());

        // 00:30 local is still the previous day in UTC
        let early = local_to_millis(date, 0, 30, Brussels);
        assert!(validate_shift_date(date, early, Brussels).is_ok());
        let previous = date.pred_opt().unwrap();
        assert!(validate_shift_date(previous, early, Brussels).is_err());
    }
}
