//! Deadline warnings and shift reminders

use chrono::{Datelike, NaiveDate};
use shared::models::{MonthYear, NotificationPreferences};

use crate::db;
use crate::db::settings::DEADLINE_CHECK_LAST_RUN;
use crate::notify::messages;
use crate::scheduling::calendar::{deadline_warning_date, format_local, today};
use crate::state::AppState;
use crate::util::now_millis;

/// Users whose warning for `next` falls on `today`
fn users_to_warn(
    subscribers: &[NotificationPreferences],
    next: MonthYear,
    deadline_days: i64,
    today: NaiveDate,
) -> Vec<(i64, i64)> {
    subscribers
        .iter()
        .filter(|p| p.notify_availability_deadline)
        .filter_map(|p| {
            let warning_days = i64::from(p.deadline_warning_days);
            let date = deadline_warning_date(next.month as u32, next.year, deadline_days, warning_days)?;
            (date == today).then_some((p.user_id, warning_days))
        })
        .collect()
}

/// Whether the warnings for `today` were already sent
fn already_ran(last_run: Option<&str>, today: NaiveDate) -> bool {
    last_run
        .and_then(|value| NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
        .is_some_and(|last| last >= today)
}

/// Warn subscribers that next month's preference deadline is near.
/// Runs at most once per local day, also across restarts.
pub async fn check_deadlines(state: &AppState) {
    let pool = &state.pool;
    let today = today(state.tz);
    match db::settings::get(pool, DEADLINE_CHECK_LAST_RUN).await {
        Ok(last) if already_ran(last.as_ref().map(|s| s.value.as_str()), today) => {
            tracing::debug!(%today, "Deadline check already done today");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(error = %e, "Deadline check: failed to load last run");
            return;
        }
    }
    let next = MonthYear {
        month: today.month() as i32,
        year: today.year(),
    }
    .next();

    let deadline_days = match db::settings::deadline_days(pool).await {
        Ok(days) => days,
        Err(e) => {
            tracing::warn!(error = %e, "Deadline check: failed to load settings");
            return;
        }
    };
    let subscribers = match db::notifications::subscribed_users(pool).await {
        Ok(users) => users,
        Err(e) => {
            tracing::warn!(error = %e, "Deadline check: failed to load subscribers");
            return;
        }
    };

    let Some(deadline) = NaiveDate::from_ymd_opt(next.year, next.month as u32, 1)
        .and_then(|first| first.checked_sub_days(chrono::Days::new(deadline_days.max(0) as u64)))
    else {
        return;
    };
    let deadline = deadline.format("%d-%m-%Y").to_string();

    // Record the run before sending so a restart mid-way cannot repeat it
    let marker = today.format("%Y-%m-%d").to_string();
    if let Err(e) = db::settings::set(pool, DEADLINE_CHECK_LAST_RUN, &marker, now_millis()).await {
        tracing::warn!(error = %e, "Deadline check: failed to record run");
        return;
    }

    let mut sent = 0;
    for (user_id, days_left) in users_to_warn(&subscribers, next, deadline_days, today) {
        let notice = messages::deadline_warning(next.month as u32, next.year, &deadline, days_left);
        if state.notifier.notify_user(user_id, &notice).await {
            sent += 1;
        }
    }
    tracing::info!(sent, month = next.month, year = next.year, "Deadline check finished");
}

/// Remind users of shifts starting within their reminder window
pub async fn send_shift_reminders(state: &AppState) {
    let now = now_millis();
    let due = match db::shifts::due_reminders(&state.pool, now).await {
        Ok(due) => due,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load due shift reminders");
            return;
        }
    };
    if due.is_empty() {
        return;
    }

    for reminder in &due {
        let start = format_local(reminder.start_time, state.tz, "%d-%m-%Y %H:%M");
        let notice = messages::shift_reminder(reminder.shift_type, &start);
        state.notifier.notify_user(reminder.user_id, &notice).await;
        // Stamp even when muted so the shift is not picked up again
        if let Err(e) = db::shifts::mark_reminder_sent(&state.pool, reminder.shift_id, now).await {
            tracing::warn!(shift_id = reminder.shift_id, error = %e, "Failed to stamp reminder");
        }
    }
    tracing::debug!(count = due.len(), "Shift reminders sent");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefs(user_id: i64, days: i32, enabled: bool) -> NotificationPreferences {
        NotificationPreferences {
            notify_availability_deadline: enabled,
            deadline_warning_days: days,
            ..NotificationPreferences::defaults(user_id)
        }
    }

    #[test]
    fn test_users_to_warn_matches_warning_date() {
        // April 2025 with a 21 day deadline closes on 11 March; 3 days earlier is 8 March
        let next = MonthYear { month: 4, year: 2025 };
        let today = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        let subscribers = [prefs(1, 3, true), prefs(2, 5, true), prefs(3, 3, false)];
        assert_eq!(users_to_warn(&subscribers, next, 21, today), vec![(1, 3)]);
    }

    #[test]
    fn test_already_ran_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 8).unwrap();
        assert!(already_ran(Some("2025-03-08"), today));
        assert!(!already_ran(Some("2025-03-07"), today));
        assert!(!already_ran(None, today));
        assert!(!already_ran(Some("garbled"), today));
    }

    #[test]
    fn test_users_to_warn_other_day() {
        let next = MonthYear { month: 4, year: 2025 };
        let today = NaiveDate::from_ymd_opt(2025, 3, 6).unwrap();
        let subscribers = [prefs(1, 3, true), prefs(2, 5, true)];
        assert_eq!(users_to_warn(&subscribers, next, 21, today), vec![(2, 5)]);
    }
}
