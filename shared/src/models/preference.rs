//! Shift Preference Model

use super::shift::ShiftType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a user is available for a given date and shift type
///
/// `First` / `Second` select one half of a split night.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "preference_type", rename_all = "lowercase"))]
pub enum PreferenceType {
    Full,
    First,
    Second,
    Unavailable,
}

impl PreferenceType {
    /// Half-night preferences only make sense for night shifts
    pub fn valid_for(&self, shift_type: ShiftType) -> bool {
        match self {
            PreferenceType::First | PreferenceType::Second => shift_type == ShiftType::Night,
            PreferenceType::Full | PreferenceType::Unavailable => true,
        }
    }
}

/// Availability statement for one (user, date, shift_type)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ShiftPreference {
    pub id: i64,
    pub user_id: i64,
    pub station_id: i64,
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub preference_type: PreferenceType,
    pub month: i32,
    pub year: i32,
    pub notes: Option<String>,
    pub created_at: i64,
}

/// Upsert preference payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceUpsert {
    /// Admins may submit on behalf of another user
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub shift_type: ShiftType,
    pub preference_type: PreferenceType,
    pub month: i32,
    pub year: i32,
    pub notes: Option<String>,
}

/// Submission deadline status for a planning month
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeadlineInfo {
    /// Deadline instant (UTC millis)
    pub deadline: i64,
    pub is_open: bool,
    /// Whole days left, 0 once closed
    pub days_left: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_night_only_for_nights() {
        assert!(PreferenceType::First.valid_for(ShiftType::Night));
        assert!(PreferenceType::Second.valid_for(ShiftType::Night));
        assert!(!PreferenceType::First.valid_for(ShiftType::Day));
        assert!(!PreferenceType::Second.valid_for(ShiftType::Day));
        assert!(PreferenceType::Full.valid_for(ShiftType::Day));
        assert!(PreferenceType::Unavailable.valid_for(ShiftType::Day));
    }
}
