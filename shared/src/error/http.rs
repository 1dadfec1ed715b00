//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Success => StatusCode::OK,

            Self::NotFound
            | Self::StationNotFound
            | Self::HolidayNotFound
            | Self::KioskTokenInvalid
            | Self::ShiftNotFound
            | Self::SwapRequestNotFound
            | Self::SwapOfferNotFound
            | Self::PreferenceNotFound
            | Self::OvertimeNotFound
            | Self::PushSubscriptionNotFound
            | Self::ReportRecipientNotFound
            | Self::UserNotFound => StatusCode::NOT_FOUND,

            Self::AlreadyExists
            | Self::StationNameExists
            | Self::StationHasDependencies
            | Self::ShiftNotOpen
            | Self::SwapInvalidState
            | Self::SwapAlreadyRequested
            | Self::SwapOfferExists
            | Self::SwapShiftChanged
            | Self::UsernameExists => StatusCode::CONFLICT,

            Self::NotAuthenticated
            | Self::InvalidCredentials
            | Self::TokenExpired
            | Self::TokenInvalid
            | Self::AccountDisabled => StatusCode::UNAUTHORIZED,

            // Lockout is a throttle, not a credential problem
            Self::AccountLocked => StatusCode::TOO_MANY_REQUESTS,

            Self::PermissionDenied
            | Self::AdminRequired
            | Self::SupervisorRequired
            | Self::StationAccessDenied
            | Self::ShiftNotOwned
            | Self::SwapsDisabled
            | Self::PreferenceDeadlinePassed => StatusCode::FORBIDDEN,

            // Transient errors, client can retry
            Self::NetworkError | Self::TimeoutError | Self::EmailSendFailed => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            Self::InternalError
            | Self::DatabaseError
            | Self::ConfigError
            | Self::ScheduleGenerationFailed => StatusCode::INTERNAL_SERVER_ERROR,

            // Validation and business rule errors
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::ShiftNotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::KioskTokenInvalid.http_status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_conflict_status() {
        assert_eq!(
            ErrorCode::StationHasDependencies.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::SwapInvalidState.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::UsernameExists.http_status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_status() {
        assert_eq!(
            ErrorCode::InvalidCredentials.http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCode::AccountLocked.http_status(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_forbidden_status() {
        assert_eq!(
            ErrorCode::PreferenceDeadlinePassed.http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ErrorCode::SwapsDisabled.http_status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ErrorCode::SupervisorRequired.http_status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_default_bad_request() {
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::PasswordTooShort.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ReportNoRecipients.http_status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors() {
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::EmailSendFailed.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
