//! Shift swaps: direct requests, open requests with offers, admin decisions

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivityCategory, OfferStatus, OpenSwapRequestCreate, Shift, SwapDecision, SwapOffer,
    SwapOfferCreate, SwapRequest, SwapRequestCreate, SwapRequestWithOffers, SwapStatus,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::db::swaps::{ApproveOutcome, NewSwapRequest};
use crate::error::{internal, map_unique};
use crate::notify::messages;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, StationQuery, audit};

const ACTIVE: [SwapStatus; 2] = [SwapStatus::Pending, SwapStatus::OfferSelected];

fn trimmed(note: Option<&str>) -> Option<&str> {
    note.map(str::trim).filter(|n| !n.is_empty())
}

async fn require_swaps_enabled(state: &AppState, station_id: i64) -> Result<(), AppError> {
    let enabled = db::stations::shift_swaps_enabled(&state.pool, station_id)
        .await
        .map_err(internal)?;
    if !enabled {
        return Err(AppError::new(ErrorCode::SwapsDisabled));
    }
    Ok(())
}

async fn load_request(state: &AppState, id: i64) -> Result<SwapRequest, AppError> {
    db::swaps::find_request(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::SwapRequestNotFound))
}

async fn load_offer(state: &AppState, id: i64) -> Result<SwapOffer, AppError> {
    db::swaps::find_offer(&state.pool, id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::SwapOfferNotFound))
}

/// A shift owned by `owner_id` that has not started yet
async fn load_owned_future_shift(
    state: &AppState,
    shift_id: i64,
    owner_id: i64,
) -> Result<Shift, AppError> {
    let shift = db::shifts::find(&state.pool, shift_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::ShiftNotFound))?;
    ensure_owned_future(&shift, owner_id, now_millis())?;
    Ok(shift)
}

fn ensure_owned_future(shift: &Shift, owner_id: i64, now: i64) -> Result<(), AppError> {
    if shift.user_id != Some(owner_id) {
        return Err(AppError::new(ErrorCode::ShiftNotOwned));
    }
    if shift.start_time <= now {
        return Err(AppError::new(ErrorCode::ShiftInPast));
    }
    Ok(())
}

/// A shift offered in exchange must be at the same station and must not
/// overlap the shift it replaces
fn ensure_exchangeable(requested: &Shift, counter: &Shift, field: &str) -> Result<(), AppError> {
    if counter.station_id != requested.station_id {
        return Err(AppError::invalid_field(
            field,
            "Shifts of another station cannot be swapped",
        ));
    }
    if counter.overlaps(requested.start_time, requested.end_time) {
        return Err(AppError::invalid_field(
            field,
            "Shifts at the same time cannot be swapped",
        ));
    }
    Ok(())
}

/// The counter shift `owner_id` gives in exchange for `requested`
async fn load_counter_shift(
    state: &AppState,
    shift_id: i64,
    owner_id: i64,
    requested: &Shift,
    field: &str,
) -> Result<Shift, AppError> {
    let counter = load_owned_future_shift(state, shift_id, owner_id).await?;
    ensure_exchangeable(requested, &counter, field)?;
    Ok(counter)
}

/// Validates the requester's shift and guards against a second active request.
/// The partial unique index catches requests racing past this check.
async fn prepare_request(
    state: &AppState,
    user: &CurrentUser,
    shift_id: i64,
) -> Result<Shift, AppError> {
    require_swaps_enabled(state, user.station_id).await?;
    let shift = load_owned_future_shift(state, shift_id, user.user_id).await?;
    let active = db::swaps::has_active_request(&state.pool, shift.id)
        .await
        .map_err(internal)?;
    if active {
        return Err(AppError::new(ErrorCode::SwapAlreadyRequested));
    }
    Ok(shift)
}

/// POST /api/shift-swaps
pub async fn create_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<SwapRequestCreate>,
) -> ApiResult<SwapRequest> {
    let shift = prepare_request(&state, &user, req.requester_shift_id).await?;

    if req.target_user_id == user.user_id {
        return Err(AppError::invalid_field(
            "target_user_id",
            "Cannot swap with yourself",
        ));
    }
    let target = db::users::find(&state.pool, req.target_user_id)
        .await
        .map_err(internal)?
        .filter(|u| u.is_active && u.station_id == shift.station_id)
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    if let Some(target_shift_id) = req.target_shift_id {
        load_counter_shift(&state, target_shift_id, target.id, &shift, "target_shift_id").await?;
    }

    let request = db::swaps::create_request(
        &state.pool,
        &NewSwapRequest {
            station_id: shift.station_id,
            requester_id: user.user_id,
            requester_shift_id: shift.id,
            target_user_id: Some(target.id),
            target_shift_id: req.target_shift_id,
            is_open: false,
            requester_note: trimmed(req.requester_note.as_deref()),
        },
        now_millis(),
    )
    .await
    .map_err(|e| map_unique(e, ErrorCode::SwapAlreadyRequested))?;

    state
        .notifier
        .spawn_notify(vec![target.id], messages::swap_update(SwapStatus::Pending));
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Wisselverzoek aangemaakt",
        Some(format!("shift {} -> {}", shift.id, target.full_name())),
    )
    .await;
    Ok(Json(request))
}

/// POST /api/open-swap-requests
pub async fn create_open_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<OpenSwapRequestCreate>,
) -> ApiResult<SwapRequest> {
    let shift = prepare_request(&state, &user, req.requester_shift_id).await?;

    let request = db::swaps::create_request(
        &state.pool,
        &NewSwapRequest {
            station_id: shift.station_id,
            requester_id: user.user_id,
            requester_shift_id: shift.id,
            target_user_id: None,
            target_shift_id: None,
            is_open: true,
            requester_note: trimmed(req.requester_note.as_deref()),
        },
        now_millis(),
    )
    .await
    .map_err(|e| map_unique(e, ErrorCode::SwapAlreadyRequested))?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Open wisselverzoek aangemaakt",
        Some(format!("shift {}", shift.id)),
    )
    .await;
    Ok(Json(request))
}

/// GET /api/shift-swaps/my-requests
pub async fn my_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<SwapRequest>> {
    let requests = db::swaps::list_for_user(&state.pool, user.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(requests))
}

/// GET /api/shift-swaps/pending
pub async fn pending(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<SwapRequest>> {
    user.require_manager()?;
    let station_id = user.scoped_station(query.station_id);
    let requests = db::swaps::list_awaiting_approval(&state.pool, station_id)
        .await
        .map_err(internal)?;
    Ok(Json(requests))
}

/// GET /api/shift-swaps/all
pub async fn all(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<SwapRequest>> {
    user.require_manager()?;
    let station_id = user.scoped_station(query.station_id);
    let requests = db::swaps::list_for_station(&state.pool, station_id)
        .await
        .map_err(internal)?;
    Ok(Json(requests))
}

/// DELETE /api/shift-swaps/{id}
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let request = load_request(&state, id).await?;
    if request.requester_id != user.user_id {
        return Err(AppError::permission_denied("Only the requester may delete this request"));
    }
    let deleted = db::swaps::delete_finished(&state.pool, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::new(ErrorCode::SwapInvalidState)
            .with_detail("status", format!("{:?}", request.status)));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// POST /api/shift-swaps/{id}/approve
///
/// Moves both shifts in one transaction.
pub async fn approve(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<SwapDecision>,
) -> ApiResult<SwapRequest> {
    user.require_manager()?;
    let request = load_request(&state, id).await?;
    user.require_station(request.station_id)?;

    let outcome = db::swaps::approve(
        &state.pool,
        id,
        user.user_id,
        trimmed(req.admin_note.as_deref()),
        now_millis(),
    )
    .await
    .map_err(internal)?;
    let approved = match outcome {
        ApproveOutcome::Approved(approved) => approved,
        ApproveOutcome::NotFound => return Err(AppError::new(ErrorCode::SwapRequestNotFound)),
        ApproveOutcome::InvalidState => return Err(AppError::new(ErrorCode::SwapInvalidState)),
        ApproveOutcome::ShiftChanged => return Err(AppError::new(ErrorCode::SwapShiftChanged)),
        ApproveOutcome::ShiftStarted => return Err(AppError::new(ErrorCode::ShiftInPast)),
    };

    let mut recipients = vec![approved.requester_id];
    recipients.extend(approved.target_user_id);
    state
        .notifier
        .spawn_notify(recipients, messages::swap_update(SwapStatus::Approved));

    tracing::info!(swap_id = id, approved_by = user.user_id, "Swap approved");
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Shift gewisseld",
        Some(format!(
            "verzoek {id}: shift {} / {:?}",
            approved.requester_shift_id, approved.target_shift_id
        )),
    )
    .await;
    Ok(Json(approved))
}

/// POST /api/shift-swaps/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<SwapDecision>,
) -> ApiResult<SwapRequest> {
    user.require_manager()?;
    let request = load_request(&state, id).await?;
    user.require_station(request.station_id)?;
    if !request.status.can_transition_to(SwapStatus::Rejected) {
        return Err(AppError::new(ErrorCode::SwapInvalidState));
    }

    let rejected = db::swaps::transition(
        &state.pool,
        id,
        &ACTIVE,
        SwapStatus::Rejected,
        trimmed(req.admin_note.as_deref()),
        now_millis(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::SwapInvalidState))?;

    let mut recipients = vec![rejected.requester_id];
    recipients.extend(rejected.target_user_id);
    state
        .notifier
        .spawn_notify(recipients, messages::swap_update(SwapStatus::Rejected));
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Wisselverzoek afgewezen",
        Some(format!("verzoek {id}")),
    )
    .await;
    Ok(Json(rejected))
}

/// POST /api/shift-swaps/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<SwapRequest> {
    let request = load_request(&state, id).await?;
    if request.requester_id != user.user_id {
        return Err(AppError::permission_denied("Only the requester may cancel this request"));
    }
    if request.status.is_terminal() {
        return Err(AppError::new(ErrorCode::SwapInvalidState));
    }
    let cancelled = db::swaps::transition(
        &state.pool,
        id,
        &ACTIVE,
        SwapStatus::Cancelled,
        None,
        now_millis(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::SwapInvalidState))?;

    if let Some(target) = cancelled.target_user_id {
        state
            .notifier
            .spawn_notify(vec![target], messages::swap_update(SwapStatus::Cancelled));
    }
    Ok(Json(cancelled))
}

/// GET /api/open-swap-requests
pub async fn list_open(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<SwapRequest>> {
    let requests = db::swaps::list_open_for_station(&state.pool, user.station_id, user.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(requests))
}

/// Attach offers to their requests, keeping request order
fn with_offers(requests: Vec<SwapRequest>, offers: Vec<SwapOffer>) -> Vec<SwapRequestWithOffers> {
    let mut by_request: HashMap<i64, Vec<SwapOffer>> = HashMap::new();
    for offer in offers {
        by_request.entry(offer.request_id).or_default().push(offer);
    }
    requests
        .into_iter()
        .map(|request| SwapRequestWithOffers {
            offers: by_request.remove(&request.id).unwrap_or_default(),
            request,
        })
        .collect()
}

/// GET /api/open-swap-requests/my
pub async fn my_open_requests(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<SwapRequestWithOffers>> {
    let requests = db::swaps::list_open_by_requester(&state.pool, user.user_id)
        .await
        .map_err(internal)?;
    let ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
    let offers = db::swaps::list_offers(&state.pool, &ids)
        .await
        .map_err(internal)?;
    Ok(Json(with_offers(requests, offers)))
}

/// POST /api/open-swap-requests/{id}/offers
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
    Json(req): Json<SwapOfferCreate>,
) -> ApiResult<SwapOffer> {
    let request = load_request(&state, id).await?;
    require_swaps_enabled(&state, request.station_id).await?;
    if !request.is_open || request.status != SwapStatus::Pending {
        return Err(AppError::new(ErrorCode::SwapInvalidState));
    }
    if request.requester_id == user.user_id {
        return Err(AppError::invalid_field(
            "request_id",
            "Cannot offer on your own request",
        ));
    }
    user.require_station(request.station_id)?;
    let requested = db::shifts::find(&state.pool, request.requester_shift_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::SwapShiftChanged))?;
    if requested.start_time <= now_millis() {
        return Err(AppError::new(ErrorCode::ShiftInPast));
    }
    if let Some(shift_id) = req.offerer_shift_id {
        load_counter_shift(&state, shift_id, user.user_id, &requested, "offerer_shift_id").await?;
    }

    let offer = db::swaps::create_offer(
        &state.pool,
        id,
        user.user_id,
        req.offerer_shift_id,
        trimmed(req.note.as_deref()),
        now_millis(),
    )
    .await
    .map_err(|e| map_unique(e, ErrorCode::SwapOfferExists))?;

    state
        .notifier
        .spawn_notify(vec![request.requester_id], messages::new_swap_offer());
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Aanbod gedaan",
        Some(format!("verzoek {id}")),
    )
    .await;
    Ok(Json(offer))
}

/// POST /api/open-swap-offers/{id}/accept
pub async fn accept_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Path(id): Path<i64>,
) -> ApiResult<SwapRequest> {
    let offer = load_offer(&state, id).await?;
    let request = load_request(&state, offer.request_id).await?;
    if request.requester_id != user.user_id {
        return Err(AppError::permission_denied("Only the requester may accept an offer"));
    }

    let selected = db::swaps::accept_offer(&state.pool, &offer, now_millis())
        .await
        .map_err(internal)?
        .ok_or_else(|| AppError::new(ErrorCode::SwapInvalidState))?;

    state.notifier.spawn_notify(
        vec![offer.offerer_id],
        messages::swap_update(SwapStatus::OfferSelected),
    );
    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Schedule,
        "Aanbod geaccepteerd",
        Some(format!("verzoek {}, aanbod {id}", request.id)),
    )
    .await;
    Ok(Json(selected))
}

/// POST /api/open-swap-offers/{id}/withdraw
pub async fn withdraw_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<SwapOffer> {
    let offer = load_offer(&state, id).await?;
    if offer.offerer_id != user.user_id {
        return Err(AppError::permission_denied("Only the offerer may withdraw this offer"));
    }
    let withdrawn = db::swaps::set_offer_status(
        &state.pool,
        id,
        OfferStatus::Pending,
        OfferStatus::Withdrawn,
        now_millis(),
    )
    .await
    .map_err(internal)?
    .ok_or_else(|| AppError::new(ErrorCode::SwapInvalidState))?;
    Ok(Json(withdrawn))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: i64) -> SwapRequest {
        SwapRequest {
            id,
            station_id: 1,
            requester_id: 10,
            requester_shift_id: 100 + id,
            target_user_id: None,
            target_shift_id: None,
            is_open: true,
            status: SwapStatus::Pending,
            requester_note: None,
            admin_note: None,
            approved_by: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn offer(id: i64, request_id: i64) -> SwapOffer {
        SwapOffer {
            id,
            request_id,
            offerer_id: 20 + id,
            offerer_shift_id: None,
            note: None,
            status: OfferStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_with_offers_groups_by_request() {
        let grouped = with_offers(
            vec![request(1), request(2), request(3)],
            vec![offer(1, 2), offer(2, 1), offer(3, 2)],
        );
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].request.id, 1);
        assert_eq!(grouped[0].offers.len(), 1);
        assert_eq!(
            grouped[1].offers.iter().map(|o| o.id).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert!(grouped[2].offers.is_empty());
    }

    fn shift(id: i64, station_id: i64, user_id: i64, start_hour: i64, hours: i64) -> Shift {
        use shared::models::{ShiftStatus, ShiftType};
        let hour = 3_600_000;
        Shift {
            id,
            station_id,
            user_id: Some(user_id),
            date: chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            start_time: start_hour * hour,
            end_time: (start_hour + hours) * hour,
            shift_type: ShiftType::Day,
            status: ShiftStatus::Planned,
            is_split_shift: false,
            month: 3,
            year: 2025,
            is_emergency_scheduling: false,
            emergency_reason: None,
            reminder_sent_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_exchangeable_shifts() {
        let requested = shift(1, 1, 10, 7, 12);
        assert!(ensure_exchangeable(&requested, &shift(2, 1, 20, 19, 12), "offerer_shift_id").is_ok());

        let overlapping = shift(3, 1, 20, 18, 4);
        let err = ensure_exchangeable(&requested, &overlapping, "offerer_shift_id").unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let elsewhere = shift(4, 2, 20, 31, 12);
        assert!(ensure_exchangeable(&requested, &elsewhere, "target_shift_id").is_err());
    }

    #[test]
    fn test_owned_future_shift() {
        let s = shift(1, 1, 10, 7, 12);
        let before = s.start_time - 1;
        assert!(ensure_owned_future(&s, 10, before).is_ok());
        assert_eq!(
            ensure_owned_future(&s, 11, before).unwrap_err().code,
            ErrorCode::ShiftNotOwned
        );
        assert_eq!(
            ensure_owned_future(&s, 10, s.start_time).unwrap_err().code,
            ErrorCode::ShiftInPast
        );
    }

    #[test]
    fn test_trimmed_drops_blank_notes() {
        assert_eq!(trimmed(Some("  ")), None);
        assert_eq!(trimmed(Some(" ruil ")), Some("ruil"));
        assert_eq!(trimmed(None), None);
    }
}
