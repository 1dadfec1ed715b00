//! Unified error codes for the planning backend
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 3xxx: Station errors
//! - 4xxx: Shift / schedule errors
//! - 5xxx: Swap errors
//! - 6xxx: Preference / overtime errors
//! - 7xxx: Notification / email errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values so the front end can match
/// on them without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password/station)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is temporarily locked after repeated failures
    AccountLocked = 1006,
    /// Account is disabled
    AccountDisabled = 1007,
    /// Password too short
    PasswordTooShort = 1008,
    /// Password reset token expired
    ResetTokenExpired = 1009,
    /// Password reset token invalid
    ResetTokenInvalid = 1010,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Supervisor role required
    SupervisorRequired = 2006,
    /// Station is not accessible for this user
    StationAccessDenied = 2007,

    // ==================== 3xxx: Station ====================
    /// Station not found
    StationNotFound = 3001,
    /// Station name or code already exists
    StationNameExists = 3002,
    /// Station still has users, shifts or preferences
    StationHasDependencies = 3003,
    /// Holiday not found
    HolidayNotFound = 3101,
    /// Kiosk token unknown
    KioskTokenInvalid = 3201,

    // ==================== 4xxx: Shift ====================
    /// Shift not found
    ShiftNotFound = 4001,
    /// Shift is not open
    ShiftNotOpen = 4002,
    /// Shift times are invalid
    ShiftInvalidTimes = 4003,
    /// Shift lies in the past
    ShiftInPast = 4004,
    /// Shift does not belong to the caller
    ShiftNotOwned = 4005,
    /// Schedule generation failed
    ScheduleGenerationFailed = 4101,

    // ==================== 5xxx: Swap ====================
    /// Swap request not found
    SwapRequestNotFound = 5001,
    /// Swap offer not found
    SwapOfferNotFound = 5002,
    /// Shift swaps are disabled for this station
    SwapsDisabled = 5003,
    /// Swap request is not in a state that allows this action
    SwapInvalidState = 5004,
    /// An active swap request already exists for this shift
    SwapAlreadyRequested = 5005,
    /// Offer already made for this request
    SwapOfferExists = 5006,
    /// Shift ownership changed since the request was made
    SwapShiftChanged = 5007,

    // ==================== 6xxx: Preference / Overtime ====================
    /// Preference not found
    PreferenceNotFound = 6001,
    /// Submission deadline for the month has passed
    PreferenceDeadlinePassed = 6002,
    /// Preference date outside requested month
    PreferenceDateOutOfMonth = 6003,
    /// Overtime record not found
    OvertimeNotFound = 6101,

    // ==================== 7xxx: Notification ====================
    /// Email transport not configured
    EmailNotConfigured = 7001,
    /// Email delivery failed
    EmailSendFailed = 7002,
    /// Push delivery not configured
    PushNotConfigured = 7003,
    /// Push subscription not found
    PushSubscriptionNotFound = 7004,
    /// No report recipients configured
    ReportNoRecipients = 7101,
    /// Report recipient not found
    ReportRecipientNotFound = 7102,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Username already exists in this station
    UsernameExists = 8002,
    /// Cannot delete own account
    UserCannotDeleteSelf = 8003,
    /// Hour limits are inconsistent
    UserInvalidHours = 8004,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Network error
    NetworkError = 9003,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid username, password or station",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountLocked => "Too many failed login attempts, try again later",
            ErrorCode::AccountDisabled => "Account is disabled",
            ErrorCode::PasswordTooShort => "Password must be at least 8 characters",
            ErrorCode::ResetTokenExpired => "Password reset link has expired",
            ErrorCode::ResetTokenInvalid => "Password reset link is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::SupervisorRequired => "Supervisor role is required",
            ErrorCode::StationAccessDenied => "No access to this station",

            // Station
            ErrorCode::StationNotFound => "Station not found",
            ErrorCode::StationNameExists => "Station name or code already exists",
            ErrorCode::StationHasDependencies => "Station still has users, shifts or preferences",
            ErrorCode::HolidayNotFound => "Holiday not found",
            ErrorCode::KioskTokenInvalid => "Unknown kiosk token",

            // Shift
            ErrorCode::ShiftNotFound => "Shift not found",
            ErrorCode::ShiftNotOpen => "Shift is not open",
            ErrorCode::ShiftInvalidTimes => "Shift end must be after its start",
            ErrorCode::ShiftInPast => "Shift lies in the past",
            ErrorCode::ShiftNotOwned => "Shift is not assigned to you",
            ErrorCode::ScheduleGenerationFailed => "Schedule generation failed",

            // Swap
            ErrorCode::SwapRequestNotFound => "Swap request not found",
            ErrorCode::SwapOfferNotFound => "Swap offer not found",
            ErrorCode::SwapsDisabled => "Shift swaps are disabled for this station",
            ErrorCode::SwapInvalidState => "Swap request cannot be changed in its current state",
            ErrorCode::SwapAlreadyRequested => "An active swap request already exists for this shift",
            ErrorCode::SwapOfferExists => "You already made an offer for this request",
            ErrorCode::SwapShiftChanged => "Shift assignment changed since the request was made",

            // Preference / Overtime
            ErrorCode::PreferenceNotFound => "Preference not found",
            ErrorCode::PreferenceDeadlinePassed => "Submission deadline for this month has passed",
            ErrorCode::PreferenceDateOutOfMonth => "Preference date is outside the requested month",
            ErrorCode::OvertimeNotFound => "Overtime record not found",

            // Notification
            ErrorCode::EmailNotConfigured => "Email delivery is not configured",
            ErrorCode::EmailSendFailed => "Email delivery failed",
            ErrorCode::PushNotConfigured => "Push delivery is not configured",
            ErrorCode::PushSubscriptionNotFound => "Push subscription not found",
            ErrorCode::ReportNoRecipients => "No report recipients configured",
            ErrorCode::ReportRecipientNotFound => "Report recipient not found",

            // User
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::UsernameExists => "Username already exists in this station",
            ErrorCode::UserCannotDeleteSelf => "Cannot delete own account",
            ErrorCode::UserInvalidHours => "Hour limits must satisfy min <= preferred <= max",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::NetworkError => "Network error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1006 => Ok(ErrorCode::AccountLocked),
            1007 => Ok(ErrorCode::AccountDisabled),
            1008 => Ok(ErrorCode::PasswordTooShort),
            1009 => Ok(ErrorCode::ResetTokenExpired),
            1010 => Ok(ErrorCode::ResetTokenInvalid),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::SupervisorRequired),
            2007 => Ok(ErrorCode::StationAccessDenied),

            // Station
            3001 => Ok(ErrorCode::StationNotFound),
            3002 => Ok(ErrorCode::StationNameExists),
            3003 => Ok(ErrorCode::StationHasDependencies),
            3101 => Ok(ErrorCode::HolidayNotFound),
            3201 => Ok(ErrorCode::KioskTokenInvalid),

            // Shift
            4001 => Ok(ErrorCode::ShiftNotFound),
            4002 => Ok(ErrorCode::ShiftNotOpen),
            4003 => Ok(ErrorCode::ShiftInvalidTimes),
            4004 => Ok(ErrorCode::ShiftInPast),
            4005 => Ok(ErrorCode::ShiftNotOwned),
            4101 => Ok(ErrorCode::ScheduleGenerationFailed),

            // Swap
            5001 => Ok(ErrorCode::SwapRequestNotFound),
            5002 => Ok(ErrorCode::SwapOfferNotFound),
            5003 => Ok(ErrorCode::SwapsDisabled),
            5004 => Ok(ErrorCode::SwapInvalidState),
            5005 => Ok(ErrorCode::SwapAlreadyRequested),
            5006 => Ok(ErrorCode::SwapOfferExists),
            5007 => Ok(ErrorCode::SwapShiftChanged),

            // Preference / Overtime
            6001 => Ok(ErrorCode::PreferenceNotFound),
            6002 => Ok(ErrorCode::PreferenceDeadlinePassed),
            6003 => Ok(ErrorCode::PreferenceDateOutOfMonth),
            6101 => Ok(ErrorCode::OvertimeNotFound),

            // Notification
            7001 => Ok(ErrorCode::EmailNotConfigured),
            7002 => Ok(ErrorCode::EmailSendFailed),
            7003 => Ok(ErrorCode::PushNotConfigured),
            7004 => Ok(ErrorCode::PushSubscriptionNotFound),
            7101 => Ok(ErrorCode::ReportNoRecipients),
            7102 => Ok(ErrorCode::ReportRecipientNotFound),

            // User
            8001 => Ok(ErrorCode::UserNotFound),
            8002 => Ok(ErrorCode::UsernameExists),
            8003 => Ok(ErrorCode::UserCannotDeleteSelf),
            8004 => Ok(ErrorCode::UserInvalidHours),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::NetworkError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::InvalidCredentials.code(), 1002);
        assert_eq!(ErrorCode::SwapInvalidState.code(), 5004);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for code in [
            ErrorCode::NotFound,
            ErrorCode::AccountLocked,
            ErrorCode::StationAccessDenied,
            ErrorCode::StationHasDependencies,
            ErrorCode::ShiftNotOpen,
            ErrorCode::SwapOfferExists,
            ErrorCode::PreferenceDeadlinePassed,
            ErrorCode::ReportNoRecipients,
            ErrorCode::UserInvalidHours,
            ErrorCode::ConfigError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_unknown_value() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::NotFound.to_string(), "E0003");
        assert_eq!(ErrorCode::SwapsDisabled.to_string(), "E5003");
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::ShiftNotFound).unwrap();
        assert_eq!(json, "4001");
        let code: ErrorCode = serde_json::from_str("1006").unwrap();
        assert_eq!(code, ErrorCode::AccountLocked);
        assert!(serde_json::from_str::<ErrorCode>("4242").is_err());
    }
}
