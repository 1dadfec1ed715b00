//! Web Push subscriptions, notification preferences and inbox

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    InboxNotification, NotificationPreferences, NotificationPreferencesUpdate, PushSubscription,
    SubscribeRequest, UnsubscribeRequest,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::state::AppState;
use crate::util::now_millis;

use super::ApiResult;

const INBOX_DEFAULT_LIMIT: i64 = 20;
const INBOX_MAX_LIMIT: i64 = 100;

#[derive(Serialize)]
pub struct VapidKeyResponse {
    pub public_key: String,
}

/// GET /api/push/vapid-public-key
pub async fn vapid_public_key(State(state): State<AppState>) -> ApiResult<VapidKeyResponse> {
    let key = state
        .notifier
        .push()
        .public_key()
        .ok_or_else(|| AppError::new(ErrorCode::PushNotConfigured))?;
    Ok(Json(VapidKeyResponse {
        public_key: key.to_string(),
    }))
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<SubscribeRequest>,
) -> ApiResult<PushSubscription> {
    let endpoint = req.endpoint.trim();
    if !endpoint.starts_with("https://") {
        return Err(AppError::invalid_field("endpoint", "Must be an https URL"));
    }
    if req.keys.p256dh.is_empty() || req.keys.auth.is_empty() {
        return Err(AppError::invalid_field("keys", "p256dh and auth are required"));
    }
    let subscription = db::push_subscriptions::upsert(
        &state.pool,
        user.user_id,
        endpoint,
        &req.keys.p256dh,
        &req.keys.auth,
        now_millis(),
    )
    .await
    .map_err(internal)?;
    tracing::debug!(user_id = user.user_id, "Push subscription stored");
    Ok(Json(subscription))
}

/// POST /api/push/unsubscribe
pub async fn unsubscribe(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UnsubscribeRequest>,
) -> ApiResult<serde_json::Value> {
    let removed = db::push_subscriptions::delete(&state.pool, user.user_id, req.endpoint.trim())
        .await
        .map_err(internal)?;
    if !removed {
        return Err(AppError::new(ErrorCode::PushSubscriptionNotFound));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /api/push/preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<NotificationPreferences> {
    let prefs = db::notifications::preferences(&state.pool, user.user_id)
        .await
        .map_err(internal)?;
    Ok(Json(prefs))
}

/// PUT /api/push/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<NotificationPreferencesUpdate>,
) -> ApiResult<NotificationPreferences> {
    if let Some(days) = req.deadline_warning_days
        && !(1..=14).contains(&days)
    {
        return Err(AppError::invalid_field(
            "deadline_warning_days",
            "Must be between 1 and 14",
        ));
    }
    let prefs = db::notifications::save_preferences(&state.pool, user.user_id, &req)
        .await
        .map_err(internal)?;
    Ok(Json(prefs))
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

/// GET /api/push/inbox
pub async fn inbox(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Vec<InboxNotification>> {
    let limit = query
        .limit
        .unwrap_or(INBOX_DEFAULT_LIMIT)
        .clamp(1, INBOX_MAX_LIMIT);
    let items = db::notifications::list_inbox(&state.pool, user.user_id, query.unread_only, limit)
        .await
        .map_err(internal)?;
    Ok(Json(items))
}

/// POST /api/push/inbox/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let updated = db::notifications::mark_read(&state.pool, user.user_id, id)
        .await
        .map_err(internal)?;
    if !updated {
        return Err(AppError::not_found("Notification"));
    }
    Ok(Json(serde_json::json!({ "read": true })))
}
