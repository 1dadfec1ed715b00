//! Error types and API response structures

use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Application error with structured error code and details
///
/// Every handler error ends up here. The code picks the HTTP status, the
/// message is shown to the user, and `details` carries machine-readable
/// context (field names, remaining lockout minutes, ...).
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Create a new error with the default message for the error code
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    /// Create a new error with a custom message
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Add a detail entry to this error
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // ==================== Convenience constructors ====================

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    /// Validation error pointing at a single request field
    pub fn invalid_field(field: &str, msg: impl Into<String>) -> Self {
        Self::validation(msg).with_detail("field", field)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        let r = resource.into();
        Self::with_message(ErrorCode::NotFound, format!("{} not found", r))
            .with_detail("resource", r)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    /// Login blocked by the rate limiter
    pub fn account_locked(remaining_minutes: i64) -> Self {
        Self::with_message(
            ErrorCode::AccountLocked,
            format!(
                "Too many failed login attempts. Try again in {} minutes",
                remaining_minutes
            ),
        )
        .with_detail("retry_after_minutes", remaining_minutes)
    }

    pub fn permission_denied(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::PermissionDenied, msg)
    }

    pub fn admin_required() -> Self {
        Self::new(ErrorCode::AdminRequired)
    }

    pub fn supervisor_required() -> Self {
        Self::new(ErrorCode::SupervisorRequired)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::AlreadyExists, msg)
    }
}

/// Unified API response structure
///
/// - `code`: Error code (0 for success)
/// - `message`: Human-readable message
/// - `data`: Response payload (on success)
/// - `details`: Additional error details (on failure)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl ApiResponse<()> {
    pub fn error(err: &AppError) -> Self {
        Self {
            code: Some(err.code.code()),
            message: err.message.clone(),
            data: None,
            details: err.details.clone(),
        }
    }
}

// ===== Axum Integration =====

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;

        let status = self.http_status();
        let body = ApiResponse::<()>::error(&self);

        if matches!(self.code.category(), super::category::ErrorCategory::System) {
            tracing::error!(
                code = %self.code,
                message = %self.message,
                "System error occurred"
            );
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_new_uses_default_message() {
        let err = AppError::new(ErrorCode::ShiftNotFound);
        assert_eq!(err.code, ErrorCode::ShiftNotFound);
        assert_eq!(err.message, "Shift not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn test_invalid_field_detail() {
        let err = AppError::invalid_field("duration_minutes", "Duration must be 1..=720");
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        let details = err.details.unwrap();
        assert_eq!(details.get("field").unwrap(), "duration_minutes");
    }

    #[test]
    fn test_account_locked_carries_minutes() {
        let err = AppError::account_locked(12);
        assert_eq!(err.code, ErrorCode::AccountLocked);
        assert!(err.message.contains("12 minutes"));
        assert_eq!(err.details.unwrap()["retry_after_minutes"], 12);
        assert_eq!(
            AppError::account_locked(1).http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_not_found_constructor() {
        let err = AppError::not_found("Station 7");
        assert_eq!(err.message, "Station 7 not found");
        assert!(err.details.as_ref().unwrap().contains_key("resource"));
        assert_eq!(err.http_status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_api_response_error_body() {
        let err = AppError::new(ErrorCode::SwapsDisabled).with_detail("station_id", 3);
        let response = ApiResponse::<()>::error(&err);
        assert_eq!(response.code, Some(5003));
        assert!(response.data.is_none());

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"code\":5003"));
        assert!(json.contains("\"station_id\":3"));
        assert!(!json.contains("\"data\""));
    }
}
