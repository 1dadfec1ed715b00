//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 2xxx: Permission errors
/// - 3xxx: Station errors
/// - 4xxx: Shift errors
/// - 5xxx: Swap errors
/// - 6xxx: Preference errors
/// - 7xxx: Notification errors
/// - 8xxx: User errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Authentication errors (1xxx)
    Auth,
    /// Permission errors (2xxx)
    Permission,
    /// Station errors (3xxx)
    Station,
    /// Shift and schedule errors (4xxx)
    Shift,
    /// Swap errors (5xxx)
    Swap,
    /// Preference and overtime errors (6xxx)
    Preference,
    /// Notification and email errors (7xxx)
    Notification,
    /// User errors (8xxx)
    User,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Station,
            4000..5000 => Self::Shift,
            5000..6000 => Self::Swap,
            6000..7000 => Self::Preference,
            7000..8000 => Self::Notification,
            8000..9000 => Self::User,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Station => "station",
            Self::Shift => "shift",
            Self::Swap => "swap",
            Self::Preference => "preference",
            Self::Notification => "notification",
            Self::User => "user",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3001), ErrorCategory::Station);
        assert_eq!(ErrorCategory::from_code(4001), ErrorCategory::Shift);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Swap);
        assert_eq!(ErrorCategory::from_code(6001), ErrorCategory::Preference);
        assert_eq!(ErrorCategory::from_code(7001), ErrorCategory::Notification);
        assert_eq!(ErrorCategory::from_code(8001), ErrorCategory::User);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Success.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::AccountLocked.category(), ErrorCategory::Auth);
        assert_eq!(
            ErrorCode::SupervisorRequired.category(),
            ErrorCategory::Permission
        );
        assert_eq!(ErrorCode::KioskTokenInvalid.category(), ErrorCategory::Station);
        assert_eq!(ErrorCode::ShiftNotOpen.category(), ErrorCategory::Shift);
        assert_eq!(ErrorCode::SwapsDisabled.category(), ErrorCategory::Swap);
        assert_eq!(
            ErrorCode::OvertimeNotFound.category(),
            ErrorCategory::Preference
        );
        assert_eq!(
            ErrorCode::EmailSendFailed.category(),
            ErrorCategory::Notification
        );
        assert_eq!(ErrorCode::UsernameExists.category(), ErrorCategory::User);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&ErrorCategory::Notification).unwrap();
        assert_eq!(json, "\"notification\"");

        let category: ErrorCategory = serde_json::from_str("\"swap\"").unwrap();
        assert_eq!(category, ErrorCategory::Swap);
        assert_eq!(category.name(), "swap");
    }
}
