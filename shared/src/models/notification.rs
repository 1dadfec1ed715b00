//! Push subscriptions, notification preferences and inbox

use serde::{Deserialize, Serialize};

/// Browser push subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct PushSubscription {
    pub id: i64,
    pub user_id: i64,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: i64,
}

/// Key material sent by the browser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

/// Per-user notification opt-ins
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotificationPreferences {
    pub user_id: i64,
    pub notify_new_planning_published: bool,
    pub notify_my_shift_changed: bool,
    pub notify_availability_deadline: bool,
    /// Days before the deadline to warn, 1..=14
    pub deadline_warning_days: i32,
    pub notify_shift_swap_updates: bool,
}

impl NotificationPreferences {
    pub fn defaults(user_id: i64) -> Self {
        Self {
            user_id,
            notify_new_planning_published: true,
            notify_my_shift_changed: true,
            notify_availability_deadline: true,
            deadline_warning_days: 3,
            notify_shift_swap_updates: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotificationPreferencesUpdate {
    pub notify_new_planning_published: Option<bool>,
    pub notify_my_shift_changed: Option<bool>,
    pub notify_availability_deadline: Option<bool>,
    pub deadline_warning_days: Option<i32>,
    pub notify_shift_swap_updates: Option<bool>,
}

/// Which opt-in flag gates a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    PlanningPublished,
    ShiftChanged,
    DeadlineWarning,
    SwapUpdate,
    ShiftReminder,
    Manual,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanningPublished => "planning_published",
            Self::ShiftChanged => "shift_changed",
            Self::DeadlineWarning => "deadline_warning",
            Self::SwapUpdate => "swap_update",
            Self::ShiftReminder => "shift_reminder",
            Self::Manual => "manual",
        }
    }

    /// Whether the user's preferences allow this notification
    pub fn allowed_by(&self, prefs: &NotificationPreferences) -> bool {
        match self {
            Self::PlanningPublished => prefs.notify_new_planning_published,
            Self::ShiftChanged => prefs.notify_my_shift_changed,
            Self::DeadlineWarning => prefs.notify_availability_deadline,
            Self::SwapUpdate => prefs.notify_shift_swap_updates,
            // Reminders are governed by shift_reminder_hours on the user
            Self::ShiftReminder | Self::Manual => true,
        }
    }
}

/// Stored notification, also sent as push payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct InboxNotification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub is_read: bool,
    pub created_at: i64,
}

/// Manual broadcast payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualNotification {
    pub title: String,
    pub body: String,
    /// Restrict to these users, otherwise the whole station
    pub user_ids: Option<Vec<i64>>,
}

/// Record of a manual broadcast
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct NotificationHistory {
    pub id: i64,
    pub station_id: i64,
    pub sent_by: i64,
    pub title: String,
    pub body: String,
    pub recipient_count: i32,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_respects_opt_out() {
        let mut prefs = NotificationPreferences::defaults(1);
        assert!(NotificationKind::SwapUpdate.allowed_by(&prefs));
        prefs.notify_shift_swap_updates = false;
        assert!(!NotificationKind::SwapUpdate.allowed_by(&prefs));
        prefs.notify_my_shift_changed = false;
        assert!(!NotificationKind::ShiftChanged.allowed_by(&prefs));
        assert!(NotificationKind::Manual.allowed_by(&prefs));
    }

    #[test]
    fn test_subscribe_request_shape() {
        let req: SubscribeRequest = serde_json::from_str(
            r#"{"endpoint":"https://push.example/abc","keys":{"p256dh":"BXX","auth":"aa"}}"#,
        )
        .unwrap();
        assert_eq!(req.keys.auth, "aa");
        assert_eq!(NotificationPreferences::defaults(5).deadline_warning_days, 3);
    }
}
