//! Activity Log Model

use serde::{Deserialize, Serialize};

/// Default and maximum page sizes for activity log queries
pub const ACTIVITY_DEFAULT_PER_PAGE: i64 = 100;
pub const ACTIVITY_MAX_PER_PAGE: i64 = 200;

/// Activity category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "activity_category", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum ActivityCategory {
    Login,
    Logout,
    Preference,
    Schedule,
    UserManagement,
    Settings,
    Overtime,
    Profile,
    Other,
}

/// Audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub station_id: Option<i64>,
    pub category: ActivityCategory,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: i64,
}

/// Activity log filter (query string)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivityLogQuery {
    pub station_id: Option<i64>,
    pub user_id: Option<i64>,
    pub category: Option<ActivityCategory>,
    /// Inclusive lower bound (UTC millis)
    pub start: Option<i64>,
    /// Exclusive upper bound (UTC millis)
    pub end: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ActivityLogQuery {
    /// (limit, offset) with clamped page size
    pub fn limit_offset(&self) -> (i64, i64) {
        let per_page = self
            .per_page
            .unwrap_or(ACTIVITY_DEFAULT_PER_PAGE)
            .clamp(1, ACTIVITY_MAX_PER_PAGE);
        let page = self.page.unwrap_or(1).max(1);
        (per_page, (page - 1) * per_page)
    }
}

/// Paginated list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_wire_format() {
        assert_eq!(
            serde_json::to_string(&ActivityCategory::UserManagement).unwrap(),
            "\"USER_MANAGEMENT\""
        );
        let c: ActivityCategory = serde_json::from_str("\"LOGIN\"").unwrap();
        assert_eq!(c, ActivityCategory::Login);
    }

    #[test]
    fn test_limit_offset_clamps() {
        assert_eq!(ActivityLogQuery::default().limit_offset(), (100, 0));
        let q = ActivityLogQuery {
            page: Some(3),
            per_page: Some(500),
            ..Default::default()
        };
        assert_eq!(q.limit_offset(), (200, 400));
        let q = ActivityLogQuery {
            page: Some(0),
            per_page: Some(0),
            ..Default::default()
        };
        assert_eq!(q.limit_offset(), (1, 0));
    }
}
