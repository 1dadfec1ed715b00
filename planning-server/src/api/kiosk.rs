//! Read-only station board for wall screens, addressed by kiosk token

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
};
use chrono::NaiveDate;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Shift, ShiftType};

use crate::db;
use crate::error::internal;
use crate::scheduling::calendar::{format_local, local_date, local_to_millis, today};
use crate::state::AppState;

use super::ApiResult;

#[derive(Serialize)]
pub struct KioskShift {
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub start: String,
    pub end: String,
    pub is_split_shift: bool,
    /// `None` for an open shift
    pub name: Option<String>,
}

#[derive(Serialize)]
pub struct KioskBoard {
    pub station: String,
    pub today: Vec<KioskShift>,
    pub tomorrow: Vec<KioskShift>,
}

/// GET /api/kiosk/{token}
pub async fn board(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> ApiResult<KioskBoard> {
    let station = db::stations::find_by_kiosk_token(&state.pool, token.trim())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::KioskTokenInvalid))?;

    let tz = state.tz;
    let day0 = today(tz);
    let day1 = day0.succ_opt().unwrap_or(day0);
    let day2 = day1.succ_opt().unwrap_or(day1);

    let shifts = db::shifts::list_range(
        &state.pool,
        station.id,
        local_to_millis(day0, 0, 0, tz),
        local_to_millis(day2, 0, 0, tz),
    )
    .await
    .map_err(internal)?;

    let user_ids: Vec<i64> = shifts.iter().filter_map(|s| s.user_id).collect();
    let names: HashMap<i64, String> = db::users::list_by_ids(&state.pool, &user_ids)
        .await
        .map_err(internal)?
        .into_iter()
        .map(|u| (u.id, u.full_name()))
        .collect();

    let to_entry = |shift: &Shift| KioskShift {
        date: shift.date,
        shift_type: shift.shift_type,
        start: format_local(shift.start_time, tz, "%H:%M"),
        end: format_local(shift.end_time, tz, "%H:%M"),
        is_split_shift: shift.is_split_shift,
        name: shift.user_id.and_then(|id| names.get(&id).cloned()),
    };

    let (today_shifts, tomorrow_shifts): (Vec<&Shift>, Vec<&Shift>) = shifts
        .iter()
        .partition(|s| local_date(s.start_time, tz) == Some(day0));

    Ok(Json(KioskBoard {
        station: station.display_name,
        today: today_shifts.into_iter().map(&to_entry).collect(),
        tomorrow: tomorrow_shifts.into_iter().map(&to_entry).collect(),
    }))
}
