//! Unified service-layer error type for planning-server
//!
//! `ServiceError` bridges DB-layer errors (`sqlx::Error`, `BoxError`) and the
//! API-layer error (`AppError`), so handlers can use `?` on both.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Service-layer error
///
/// - `Db`: Database/infrastructure errors (logged, mapped to InternalError)
/// - `App`: Business-rule errors (passed through to the client)
#[derive(Debug)]
pub enum ServiceError {
    Db(BoxError),
    App(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Db(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Db(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::App(e)
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::App(app_err) => app_err,
            ServiceError::Db(db_err) => {
                tracing::error!(error = %db_err, "Service database error");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Log a DB error and turn it into an opaque `InternalError`
pub fn internal(e: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %e, "Database error");
    AppError::new(ErrorCode::InternalError)
}

/// Map a unique-violation to the given conflict code, anything else to internal
pub fn map_unique(e: sqlx::Error, code: ErrorCode) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        return AppError::new(code);
    }
    internal(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_passes_through() {
        let err: AppError = ServiceError::App(AppError::new(ErrorCode::ShiftNotOpen)).into();
        assert_eq!(err.code, ErrorCode::ShiftNotOpen);
    }

    #[test]
    fn test_db_error_is_opaque() {
        let err: AppError = ServiceError::from(sqlx::Error::RowNotFound).into();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, "Internal server error");
    }

    #[test]
    fn test_map_unique_non_database_error() {
        let err = map_unique(sqlx::Error::PoolTimedOut, ErrorCode::UsernameExists);
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
