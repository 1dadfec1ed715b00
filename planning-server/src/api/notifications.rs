//! Manual broadcasts to station staff

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::Serialize;
use shared::error::AppError;
use shared::models::{ActivityCategory, ManualNotification, NotificationHistory};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::notify::messages;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, StationQuery, audit};

const MAX_TITLE_LEN: usize = 100;
const MAX_BODY_LEN: usize = 1000;

#[derive(Serialize)]
pub struct SendResponse {
    pub recipients: usize,
    pub delivered: usize,
}

/// POST /api/notifications/send
///
/// Delivers synchronously so the admin sees how many users received it.
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<ManualNotification>,
) -> ApiResult<SendResponse> {
    user.require_manager()?;
    let title = req.title.trim();
    let body = req.body.trim();
    if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::invalid_field(
            "title",
            format!("Must be 1 to {MAX_TITLE_LEN} characters"),
        ));
    }
    if body.is_empty() || body.chars().count() > MAX_BODY_LEN {
        return Err(AppError::invalid_field(
            "body",
            format!("Must be 1 to {MAX_BODY_LEN} characters"),
        ));
    }

    let station_users = db::users::list_active_by_station(&state.pool, user.station_id)
        .await
        .map_err(internal)?;
    let user_ids: Vec<i64> = match &req.user_ids {
        // Only users of the sender's station can be addressed
        Some(ids) => station_users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| u.id)
            .collect(),
        None => station_users.iter().map(|u| u.id).collect(),
    };
    if user_ids.is_empty() {
        return Err(AppError::invalid_field("user_ids", "No recipients"));
    }

    let delivered = state
        .notifier
        .notify_users(&user_ids, &messages::manual(title, body))
        .await;

    db::notifications::record_history(
        &state.pool,
        user.station_id,
        user.user_id,
        title,
        body,
        i32::try_from(delivered).unwrap_or(i32::MAX),
        now_millis(),
    )
    .await
    .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Other,
        "Melding verstuurd",
        Some(format!("{title} ({delivered}/{})", user_ids.len())),
    )
    .await;
    Ok(Json(SendResponse {
        recipients: user_ids.len(),
        delivered,
    }))
}

/// GET /api/notifications/history?station_id
pub async fn history(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<StationQuery>,
) -> ApiResult<Vec<NotificationHistory>> {
    user.require_manager()?;
    let station_id = user.scoped_station(query.station_id);
    let items = db::notifications::list_history(&state.pool, station_id)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}
