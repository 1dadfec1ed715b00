//! Overtime Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest overtime entry in minutes (12 h)
pub const MAX_OVERTIME_MINUTES: i32 = 720;

/// Overtime worked beyond a shift
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Overtime {
    pub id: i64,
    pub user_id: i64,
    /// `None` once the shift was deleted or its month regenerated
    pub shift_id: Option<i64>,
    pub station_id: i64,
    pub date: NaiveDate,
    /// UTC millis
    pub start_time: i64,
    pub duration_minutes: i32,
    pub reason: String,
    pub month: i32,
    pub year: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvertimeCreate {
    pub shift_id: i64,
    pub date: NaiveDate,
    pub start_time: i64,
    pub duration_minutes: i32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OvertimeUpdate {
    pub date: Option<NaiveDate>,
    pub start_time: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

/// Overtime row joined with the worker's name (station overview)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OvertimeWithUser {
    #[serde(flatten)]
    #[cfg_attr(feature = "db", sqlx(flatten))]
    pub overtime: Overtime,
    pub first_name: String,
    pub last_name: String,
}

pub fn validate_overtime(duration_minutes: i32, reason: &str) -> Result<(), String> {
    if !(1..=MAX_OVERTIME_MINUTES).contains(&duration_minutes) {
        return Err(format!(
            "duration_minutes must be between 1 and {MAX_OVERTIME_MINUTES}"
        ));
    }
    if reason.trim().is_empty() {
        return Err("reason is required".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_overtime() {
        assert!(validate_overtime(1, "late call").is_ok());
        assert!(validate_overtime(720, "late call").is_ok());
        assert!(validate_overtime(0, "late call").is_err());
        assert!(validate_overtime(721, "late call").is_err());
        assert!(validate_overtime(30, "   ").is_err());
    }
}
