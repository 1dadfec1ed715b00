//! Notification texts (Dutch, as shown to station staff)

use shared::models::{NotificationKind, ShiftType, SwapStatus};
use shared::util::dutch_month_name;

/// A rendered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    /// Client route opened on click
    pub url: Option<String>,
}

pub fn planning_published(month: u32, year: i32) -> Notice {
    Notice {
        kind: NotificationKind::PlanningPublished,
        title: "Nieuwe planning beschikbaar".to_string(),
        body: format!(
            "De planning voor {} {year} is gepubliceerd.",
            dutch_month_name(month)
        ),
        url: Some("/schedule".to_string()),
    }
}

/// `when` is the formatted local start of the shift (`dd-mm-yyyy HH:MM`)
pub fn shift_changed(when: &str, assigned: bool) -> Notice {
    let body = if assigned {
        format!("Je bent ingepland voor de shift van {when}.")
    } else {
        format!("Je shift van {when} werd gewijzigd of verwijderd.")
    };
    Notice {
        kind: NotificationKind::ShiftChanged,
        title: "Shift gewijzigd".to_string(),
        body,
        url: Some("/schedule".to_string()),
    }
}

pub fn swap_update(status: SwapStatus) -> Notice {
    let body = match status {
        SwapStatus::Pending => "Je hebt een nieuw wisselverzoek ontvangen.",
        SwapStatus::OfferSelected => "Een aanbod op je wisselverzoek werd gekozen en wacht op goedkeuring.",
        SwapStatus::Approved => "Je wisselverzoek werd goedgekeurd.",
        SwapStatus::Rejected => "Je wisselverzoek werd afgewezen.",
        SwapStatus::Cancelled => "Een wisselverzoek werd geannuleerd.",
    };
    Notice {
        kind: NotificationKind::SwapUpdate,
        title: "Shift wissel".to_string(),
        body: body.to_string(),
        url: Some("/shift-swaps".to_string()),
    }
}

pub fn new_swap_offer() -> Notice {
    Notice {
        kind: NotificationKind::SwapUpdate,
        title: "Shift wissel".to_string(),
        body: "Er is een nieuw aanbod op je open wisselverzoek.".to_string(),
        url: Some("/shift-swaps".to_string()),
    }
}

/// `deadline` is the formatted local deadline date
pub fn deadline_warning(month: u32, year: i32, deadline: &str, days_left: i64) -> Notice {
    let dagen = if days_left == 1 { "dag" } else { "dagen" };
    Notice {
        kind: NotificationKind::DeadlineWarning,
        title: "Beschikbaarheid doorgeven".to_string(),
        body: format!(
            "Nog {days_left} {dagen} om je beschikbaarheid voor {} {year} door te geven (deadline {deadline}).",
            dutch_month_name(month)
        ),
        url: Some("/preferences".to_string()),
    }
}

/// `start` is the formatted local start time
pub fn shift_reminder(shift_type: ShiftType, start: &str) -> Notice {
    let label = match shift_type {
        ShiftType::Day => "dagshift",
        ShiftType::Night => "nachtshift",
    };
    Notice {
        kind: NotificationKind::ShiftReminder,
        title: "Herinnering shift".to_string(),
        body: format!("Je {label} begint op {start}."),
        url: Some("/schedule".to_string()),
    }
}

pub fn manual(title: &str, body: &str) -> Notice {
    Notice {
        kind: NotificationKind::Manual,
        title: title.to_string(),
        body: body.to_string(),
        url: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planning_published_month_name() {
        let notice = planning_published(3, 2025);
        assert_eq!(notice.kind, NotificationKind::PlanningPublished);
        assert_eq!(notice.body, "De planning voor maart 2025 is gepubliceerd.");
    }

    #[test]
    fn test_deadline_warning_plural() {
        let one = deadline_warning(4, 2025, "11-03-2025", 1);
        assert!(one.body.starts_with("Nog 1 dag om"));
        let three = deadline_warning(4, 2025, "11-03-2025", 3);
        assert!(three.body.contains("Nog 3 dagen"));
        assert!(three.body.contains("april 2025"));
        assert!(three.body.contains("11-03-2025"));
    }

    #[test]
    fn test_shift_reminder_label() {
        assert_eq!(
            shift_reminder(ShiftType::Night, "19:00").body,
            "Je nachtshift begint op 19:00."
        );
        assert_eq!(shift_reminder(ShiftType::Day, "07:00").kind, NotificationKind::ShiftReminder);
    }

    #[test]
    fn test_swap_update_kind() {
        for status in [SwapStatus::Approved, SwapStatus::Rejected, SwapStatus::Cancelled] {
            assert_eq!(swap_update(status).kind, NotificationKind::SwapUpdate);
        }
    }
}
