//! Station Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Station entity (a physical post scoping users, shifts and settings)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Station {
    pub id: i64,
    /// Unique short name
    pub name: String,
    /// Unique code used in exports
    pub code: String,
    pub display_name: String,
    pub created_at: i64,
}

/// Create station payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationCreate {
    pub name: String,
    pub code: String,
    pub display_name: String,
}

/// Update station payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StationUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub display_name: Option<String>,
}

/// Rows still referencing a station
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationDependencies {
    pub users: i64,
    pub shifts: i64,
    pub preferences: i64,
}

impl StationDependencies {
    pub fn is_empty(&self) -> bool {
        self.users == 0 && self.shifts == 0 && self.preferences == 0
    }
}

/// Per-station, per-weekday generation settings
///
/// `day_of_week` follows 0 = Sunday .. 6 = Saturday.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct WeekdayConfig {
    pub id: i64,
    pub station_id: i64,
    pub day_of_week: i32,
    pub enable_day_shifts: bool,
    pub enable_night_shifts: bool,
    pub day_shift_count: i32,
    pub night_shift_count: i32,
    /// Use the full-night strategy (weekend style) instead of split nights
    pub full_night_shifts: bool,
}

impl WeekdayConfig {
    /// Defaults: 2 day and 2 night positions, full nights on Saturday and Sunday
    pub fn default_for(station_id: i64, day_of_week: i32) -> Self {
        Self {
            id: 0,
            station_id,
            day_of_week,
            enable_day_shifts: true,
            enable_night_shifts: true,
            day_shift_count: 2,
            night_shift_count: 2,
            full_night_shifts: day_of_week == 0 || day_of_week == 6,
        }
    }
}

/// Update weekday config payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WeekdayConfigUpdate {
    pub enable_day_shifts: Option<bool>,
    pub enable_night_shifts: Option<bool>,
    pub day_shift_count: Option<i32>,
    pub night_shift_count: Option<i32>,
    pub full_night_shifts: Option<bool>,
}

/// Holiday category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "holiday_category", rename_all = "lowercase"))]
pub enum HolidayCategory {
    National,
    Regional,
    Custom,
}

/// Holiday entity. `station_id = None` applies to every station.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Holiday {
    pub id: i64,
    pub station_id: Option<i64>,
    pub name: String,
    pub date: NaiveDate,
    pub category: HolidayCategory,
    pub is_active: bool,
    pub created_at: i64,
}

/// Create holiday payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HolidayCreate {
    pub name: String,
    pub date: NaiveDate,
    pub category: Option<HolidayCategory>,
    pub station_id: Option<i64>,
}

/// Update holiday payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HolidayUpdate {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub category: Option<HolidayCategory>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weekday_defaults_full_nights_on_weekend() {
        let full: Vec<bool> = (0..7)
            .map(|d| WeekdayConfig::default_for(1, d).full_night_shifts)
            .collect();
        assert_eq!(full, vec![true, false, false, false, false, false, true]);
        let monday = WeekdayConfig::default_for(1, 1);
        assert_eq!(monday.day_shift_count, 2);
        assert_eq!(monday.night_shift_count, 2);
    }

    #[test]
    fn test_dependencies_empty() {
        assert!(StationDependencies::default().is_empty());
        let deps = StationDependencies {
            shifts: 3,
            ..Default::default()
        };
        assert!(!deps.is_empty());
    }
}
