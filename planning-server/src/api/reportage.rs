//! Monthly report configuration, recipients and manual sends

use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    ActivityCategory, ReportageConfig, ReportageConfigUpdate, ReportageLog, ReportageRecipient,
    ReportageRecipientCreate, ReportageRecipientUpdate,
};

use crate::auth::CurrentUser;
use crate::db;
use crate::error::internal;
use crate::services::reportage::send_report;
use crate::state::AppState;
use crate::util::now_millis;

use super::{ApiResult, ClientMeta, MonthQuery, audit};

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if !looks_like_email(email.trim()) {
        return Err(AppError::invalid_field("email", "Invalid email address"));
    }
    Ok(())
}

/// GET /api/reportage/config
pub async fn get_config(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ReportageConfig> {
    user.require_supervisor()?;
    let config = db::reportage::config(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(config))
}

/// PUT /api/reportage/config
pub async fn update_config(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<ReportageConfigUpdate>,
) -> ApiResult<ReportageConfig> {
    user.require_supervisor()?;
    if let Some(day) = req.days_after_month_end
        && !(1..=28).contains(&day)
    {
        return Err(AppError::invalid_field(
            "days_after_month_end",
            "Must be between 1 and 28",
        ));
    }
    if req.email_subject.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(AppError::invalid_field("email_subject", "Must not be empty"));
    }
    let config = db::reportage::update_config(&state.pool, &req, now_millis())
        .await
        .map_err(internal)?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Settings,
        "Rapportage-instellingen gewijzigd",
        Some(format!(
            "actief: {}, dag: {}",
            config.enabled, config.days_after_month_end
        )),
    )
    .await;
    Ok(Json(config))
}

/// GET /api/reportage/recipients
pub async fn list_recipients(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<ReportageRecipient>> {
    user.require_supervisor()?;
    let recipients = db::reportage::list_recipients(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(recipients))
}

/// POST /api/reportage/recipients
pub async fn create_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<ReportageRecipientCreate>,
) -> ApiResult<ReportageRecipient> {
    user.require_supervisor()?;
    validate_email(&req.email)?;
    let recipient = db::reportage::create_recipient(&state.pool, &req, now_millis())
        .await
        .map_err(|e| crate::error::map_unique(e, ErrorCode::AlreadyExists))?;
    Ok(Json(recipient))
}

/// PATCH /api/reportage/recipients/{id}
pub async fn update_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(req): Json<ReportageRecipientUpdate>,
) -> ApiResult<ReportageRecipient> {
    user.require_supervisor()?;
    if let Some(email) = &req.email {
        validate_email(email)?;
    }
    let recipient = db::reportage::update_recipient(&state.pool, id, &req)
        .await
        .map_err(|e| crate::error::map_unique(e, ErrorCode::AlreadyExists))?
        .ok_or_else(|| AppError::new(ErrorCode::ReportRecipientNotFound))?;
    Ok(Json(recipient))
}

/// DELETE /api/reportage/recipients/{id}
pub async fn delete_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    user.require_supervisor()?;
    let deleted = db::reportage::delete_recipient(&state.pool, id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(AppError::new(ErrorCode::ReportRecipientNotFound));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /api/reportage/logs
pub async fn logs(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Vec<ReportageLog>> {
    user.require_supervisor()?;
    let logs = db::reportage::list_logs(&state.pool)
        .await
        .map_err(internal)?;
    Ok(Json(logs))
}

/// POST /api/reportage/send
pub async fn send(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    meta: ClientMeta,
    Json(req): Json<MonthQuery>,
) -> ApiResult<ReportageLog> {
    user.require_supervisor()?;
    let my = req.validated()?;
    let log = send_report(&state, my).await?;

    audit(
        &state,
        &meta,
        &user,
        ActivityCategory::Other,
        "Rapportage verstuurd",
        Some(format!(
            "{}/{} naar {} ontvangers",
            my.month, my.year, log.recipient_count
        )),
    )
    .await;
    Ok(Json(log))
}

#[derive(Serialize)]
pub struct ConnectionStatus {
    pub configured: bool,
}

/// POST /api/reportage/test-connection
pub async fn test_connection(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<ConnectionStatus> {
    user.require_supervisor()?;
    Ok(Json(ConnectionStatus {
        configured: state.email.is_configured(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub email: String,
}

/// POST /api/reportage/test-email
pub async fn test_email(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<TestEmailRequest>,
) -> ApiResult<serde_json::Value> {
    user.require_supervisor()?;
    validate_email(&req.email)?;
    if !state.email.is_configured() {
        return Err(AppError::new(ErrorCode::EmailNotConfigured));
    }
    state.email.send_test(req.email.trim()).await.map_err(|e| {
        tracing::warn!(error = %e, "Test email failed");
        AppError::with_message(ErrorCode::EmailSendFailed, e.to_string())
    })?;
    Ok(Json(serde_json::json!({ "sent": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("planning@station.be"));
        assert!(!looks_like_email("planning"));
        assert!(!looks_like_email("@station.be"));
        assert!(!looks_like_email("planning@localhost"));
        assert!(!looks_like_email("planning@station."));
    }
}
