//! HTTP API for planning-server

pub mod activity;
pub mod auth;
pub mod health;
pub mod holidays;
pub mod kiosk;
pub mod notifications;
pub mod overtime;
pub mod preferences;
pub mod push;
pub mod reportage;
pub mod schedule;
pub mod settings;
pub mod shifts;
pub mod stations;
pub mod statistics;
pub mod swaps;
pub mod users;
pub mod weekday_configs;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::routing::{delete, get, patch, post, put};
use axum::{Router, middleware};
use serde::Deserialize;
use shared::error::AppError;
use shared::models::{ActivityCategory, MonthYear};
use tower_http::trace::TraceLayer;

use crate::auth::CurrentUser;
use crate::auth::user_auth::user_auth_middleware;
use crate::db::activity::{ActivityContext, log_activity};
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Client address and user agent, recorded in the activity log
#[derive(Debug, Clone)]
pub struct ClientMeta {
    pub ip: String,
    pub user_agent: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<std::net::SocketAddr>>()
            .map(|ci| ci.0);
        Ok(Self {
            ip: crate::auth::rate_limit::client_ip(&parts.headers, peer),
            user_agent: parts
                .headers
                .get(http::header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        })
    }
}

impl ClientMeta {
    pub fn context(&self, user: Option<&CurrentUser>) -> ActivityContext {
        ActivityContext {
            user_id: user.map(|u| u.user_id),
            station_id: user.map(|u| u.station_id),
            ip_address: Some(self.ip.clone()),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Write an activity log entry for the current user
pub async fn audit(
    state: &AppState,
    meta: &ClientMeta,
    user: &CurrentUser,
    category: ActivityCategory,
    action: &str,
    details: Option<String>,
) {
    log_activity(
        &state.pool,
        &meta.context(Some(user)),
        category,
        action,
        details.as_deref(),
    )
    .await;
}

/// `?station_id=` query; ignored unless the caller is a supervisor
#[derive(Debug, Deserialize)]
pub struct StationQuery {
    pub station_id: Option<i64>,
}

/// `?month=&year=` query
#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: i32,
    pub year: i32,
    pub station_id: Option<i64>,
}

impl MonthQuery {
    pub fn validated(&self) -> Result<MonthYear, AppError> {
        let my = MonthYear {
            month: self.month,
            year: self.year,
        };
        my.validate().map_err(AppError::validation)?;
        Ok(my)
    }
}

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/login", post(auth::login))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/stations/public", get(stations::list_public))
        .route("/api/kiosk/{token}", get(kiosk::board))
        .route("/api/push/vapid-public-key", get(push::vapid_public_key));

    let protected = Router::new()
        // Session
        .route("/api/logout", post(auth::logout))
        .route("/api/user", get(auth::me))
        .route("/api/auth/switch-station", post(auth::switch_station))
        // Stations
        .route("/api/stations", get(stations::list).post(stations::create))
        .route("/api/stations/{id}", put(stations::update).delete(stations::delete))
        .route("/api/stations/{id}/dependencies", get(stations::dependencies))
        .route("/api/stations/{id}/kiosk-token", post(stations::rotate_kiosk_token))
        .route(
            "/api/station-settings/{id}/shift-swaps-enabled",
            get(stations::get_swaps_enabled).put(stations::set_swaps_enabled),
        )
        .route("/api/weekday-configs", get(weekday_configs::list))
        .route("/api/weekday-configs/initialize", post(weekday_configs::initialize))
        .route("/api/weekday-configs/{day}", put(weekday_configs::update))
        .route("/api/holidays", get(holidays::list).post(holidays::create))
        .route("/api/holidays/{id}", patch(holidays::update).delete(holidays::delete))
        // Users
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/all", get(users::list_all))
        .route("/api/users/{id}", patch(users::update).delete(users::delete))
        .route("/api/users/{id}/preferences", patch(users::update_hour_preferences))
        .route("/api/users/{id}/display-settings", patch(users::update_display_settings))
        .route("/api/users/{id}/password", patch(users::change_password))
        .route("/api/users/{id}/accessible-stations", get(users::accessible_stations))
        .route(
            "/api/users/{id}/station-access/{station_id}",
            post(users::grant_station_access).delete(users::revoke_station_access),
        )
        // Shifts
        .route("/api/shifts", get(shifts::list).post(shifts::create))
        .route("/api/shifts/open", get(shifts::list_open))
        .route("/api/shifts/my", get(shifts::list_my))
        .route("/api/shifts/export", get(shifts::export))
        .route("/api/shifts/{id}", patch(shifts::update).delete(shifts::delete))
        .route("/api/shifts/{id}/emergency-assign", post(shifts::emergency_assign))
        .route("/api/emergency-scheduling/users", get(shifts::emergency_candidates))
        // Schedule
        .route("/api/schedule/generate", post(schedule::generate))
        .route("/api/schedule/publish", post(schedule::publish))
        // Preferences
        .route("/api/preferences", post(preferences::upsert))
        .route("/api/preferences/all", get(preferences::list_all))
        .route("/api/preferences/deadline", get(preferences::deadline))
        .route("/api/preferences/{id}", delete(preferences::delete))
        .route(
            "/api/preferences/clear-month/{id}/{month}/{year}",
            delete(preferences::clear_month),
        )
        .route("/api/preferences/{id}/{month}/{year}", get(preferences::list_for_user))
        // Swaps
        .route("/api/shift-swaps", post(swaps::create_request))
        .route("/api/shift-swaps/my-requests", get(swaps::my_requests))
        .route("/api/shift-swaps/pending", get(swaps::pending))
        .route("/api/shift-swaps/all", get(swaps::all))
        .route("/api/shift-swaps/{id}", delete(swaps::delete_request))
        .route("/api/shift-swaps/{id}/approve", post(swaps::approve))
        .route("/api/shift-swaps/{id}/reject", post(swaps::reject))
        .route("/api/shift-swaps/{id}/cancel", post(swaps::cancel))
        .route(
            "/api/open-swap-requests",
            get(swaps::list_open).post(swaps::create_open_request),
        )
        .route("/api/open-swap-requests/my", get(swaps::my_open_requests))
        .route("/api/open-swap-requests/{id}/offers", post(swaps::create_offer))
        .route("/api/open-swap-offers/{id}/accept", post(swaps::accept_offer))
        .route("/api/open-swap-offers/{id}/withdraw", post(swaps::withdraw_offer))
        // Overtime
        .route("/api/overtime", post(overtime::create))
        .route("/api/overtime/{id}", patch(overtime::update).delete(overtime::delete))
        .route("/api/overtime/my/{year}/{month}", get(overtime::list_my))
        .route(
            "/api/overtime/station/{station_id}/{year}/{month}",
            get(overtime::list_station),
        )
        // Activity log and statistics
        .route("/api/activity-logs", get(activity::list))
        .route("/api/statistics", get(statistics::monthly))
        // Push and notifications
        .route("/api/push/subscribe", post(push::subscribe))
        .route("/api/push/unsubscribe", post(push::unsubscribe))
        .route("/api/push/preferences", get(push::get_preferences).put(push::update_preferences))
        .route("/api/push/inbox", get(push::inbox))
        .route("/api/push/inbox/{id}/read", post(push::mark_read))
        .route("/api/notifications/send", post(notifications::send))
        .route("/api/notifications/history", get(notifications::history))
        // System settings
        .route("/api/settings/{key}", get(settings::get).put(settings::put))
        // Monthly report
        .route("/api/reportage/config", get(reportage::get_config).put(reportage::update_config))
        .route(
            "/api/reportage/recipients",
            get(reportage::list_recipients).post(reportage::create_recipient),
        )
        .route(
            "/api/reportage/recipients/{id}",
            patch(reportage::update_recipient).delete(reportage::delete_recipient),
        )
        .route("/api/reportage/logs", get(reportage::logs))
        .route("/api/reportage/send", post(reportage::send))
        .route("/api/reportage/test-connection", post(reportage::test_connection))
        .route("/api/reportage/test-email", post(reportage::test_email))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
