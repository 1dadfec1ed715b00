//! Shift Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shift type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "shift_type", rename_all = "lowercase"))]
pub enum ShiftType {
    Day,
    Night,
}

impl ShiftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftType::Day => "day",
            ShiftType::Night => "night",
        }
    }
}

/// Shift status. `Open` shifts have no user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "shift_status", rename_all = "lowercase"))]
pub enum ShiftStatus {
    #[default]
    Open,
    Planned,
}

impl ShiftStatus {
    /// Status follows from whether a user is assigned
    pub fn for_assignment(user_id: Option<i64>) -> Self {
        if user_id.is_some() {
            Self::Planned
        } else {
            Self::Open
        }
    }
}

/// Shift record
///
/// `start_time` / `end_time` are UTC epoch millis. Night shifts end on the
/// following calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Shift {
    pub id: i64,
    pub station_id: i64,
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
    pub shift_type: ShiftType,
    pub status: ShiftStatus,
    pub is_split_shift: bool,
    pub month: i32,
    pub year: i32,
    pub is_emergency_scheduling: bool,
    pub emergency_reason: Option<String>,
    pub reminder_sent_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Shift {
    /// Duration in whole hours
    pub fn hours(&self) -> i64 {
        (self.end_time - self.start_time) / 3_600_000
    }

    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// Create shift payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftCreate {
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
    pub shift_type: ShiftType,
    #[serde(default)]
    pub is_split_shift: bool,
}

/// Update shift payload
///
/// `user_id: Some(None)` unassigns, `None` leaves the assignment untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShiftUpdate {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub user_id: Option<Option<i64>>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub shift_type: Option<ShiftType>,
    pub is_split_shift: Option<bool>,
}

/// Emergency assignment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAssign {
    pub user_id: i64,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_assignment() {
        assert_eq!(ShiftStatus::for_assignment(Some(4)), ShiftStatus::Planned);
        assert_eq!(ShiftStatus::for_assignment(None), ShiftStatus::Open);
    }

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let absent: ShiftUpdate = serde_json::from_str(r#"{"start_time": 5}"#).unwrap();
        assert_eq!(absent.user_id, None);

        let cleared: ShiftUpdate = serde_json::from_str(r#"{"user_id": null}"#).unwrap();
        assert_eq!(cleared.user_id, Some(None));

        let assigned: ShiftUpdate = serde_json::from_str(r#"{"user_id": 9}"#).unwrap();
        assert_eq!(assigned.user_id, Some(Some(9)));

        let json = serde_json::to_value(&cleared).unwrap();
        assert!(json["user_id"].is_null());
        assert!(json.as_object().unwrap().contains_key("user_id"));
        let json = serde_json::to_value(&absent).unwrap();
        assert!(!json.as_object().unwrap().contains_key("user_id"));
    }

    #[test]
    fn test_overlap_and_hours() {
        let shift = Shift {
            id: 1,
            station_id: 1,
            user_id: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            start_time: 0,
            end_time: 12 * 3_600_000,
            shift_type: ShiftType::Day,
            status: ShiftStatus::Open,
            is_split_shift: false,
            month: 3,
            year: 2025,
            is_emergency_scheduling: false,
            emergency_reason: None,
            reminder_sent_at: None,
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(shift.hours(), 12);
        assert!(shift.overlaps(3_600_000, 2 * 3_600_000));
        assert!(!shift.overlaps(12 * 3_600_000, 13 * 3_600_000));
    }
}
