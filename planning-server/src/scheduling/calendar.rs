//! Civil-time helpers for the configured timezone
//!
//! Handlers and the generator work with `NaiveDate` + local hour. Everything
//! stored is UTC millis.

use chrono::{Datelike, NaiveDate, TimeZone};
use chrono_tz::Tz;
use shared::models::DeadlineInfo;

const DAY_MS: i64 = 24 * 3_600_000;

/// Local date + hour:minute -> UTC millis
///
/// DST gap fallback: a non-existent local time is read as UTC.
pub fn local_to_millis(date: NaiveDate, hour: u32, minute: u32, tz: Tz) -> i64 {
    let Some(naive) = date.and_hms_opt(hour, minute, 0) else {
        return date.and_time(chrono::NaiveTime::MIN).and_utc().timestamp_millis();
    };
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 0 = Sunday .. 6 = Saturday
pub fn day_of_week(date: NaiveDate) -> i32 {
    date.weekday().num_days_from_sunday() as i32
}

pub fn today(tz: Tz) -> NaiveDate {
    chrono::Utc::now().with_timezone(&tz).date_naive()
}

/// Local calendar date of a UTC millis instant
pub fn local_date(millis: i64, tz: Tz) -> Option<NaiveDate> {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.date_naive())
}

/// Format a UTC millis instant in local time (`%H:%M`, `%d-%m-%Y`, ...)
pub fn format_local(millis: i64, tz: Tz, fmt: &str) -> String {
    tz.timestamp_millis_opt(millis)
        .single()
        .map(|dt| dt.format(fmt).to_string())
        .unwrap_or_default()
}

/// First and last day of a month
pub fn month_bounds(month: u32, year: i32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let days = shared::util::days_in_month(year, month)?;
    let last = NaiveDate::from_ymd_opt(year, month, days)?;
    Some((first, last))
}

/// Preference submission deadline for a planning month
///
/// Closes at 00:00 local time, `deadline_days` days before the 1st.
pub fn preference_deadline(month: u32, year: i32, deadline_days: i64, tz: Tz) -> Option<i64> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let deadline_date = first.checked_sub_days(chrono::Days::new(deadline_days.max(0) as u64))?;
    Some(local_to_millis(deadline_date, 0, 0, tz))
}

pub fn deadline_info(
    month: u32,
    year: i32,
    deadline_days: i64,
    now_millis: i64,
    tz: Tz,
) -> Option<DeadlineInfo> {
    let deadline = preference_deadline(month, year, deadline_days, tz)?;
    let is_open = now_millis < deadline;
    let days_left = if is_open {
        (deadline - now_millis + DAY_MS - 1) / DAY_MS
    } else {
        0
    };
    Some(DeadlineInfo {
        deadline,
        is_open,
        days_left,
    })
}

/// Date the deadline warning goes out: deadline date minus `warning_days`
pub fn deadline_warning_date(
    month: u32,
    year: i32,
    deadline_days: i64,
    warning_days: i64,
) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    first.checked_sub_days(chrono::Days::new((deadline_days + warning_days).max(0) as u64))
}

/// Time until the next occurrence of `hour:minute` local time
pub fn duration_until_next_local(now: chrono::DateTime<Tz>, hour: u32, minute: u32) -> std::time::Duration {
    let tz = now.timezone();
    let today = now.date_naive();
    let mut target = local_to_millis(today, hour, minute, tz);
    if target <= now.timestamp_millis() {
        let tomorrow = today.succ_opt().unwrap_or(today);
        target = local_to_millis(tomorrow, hour, minute, tz);
    }
    let ms = (target - now.timestamp_millis()).max(0) as u64;
    std::time::Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Brussels;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_local_to_millis_winter_and_summer() {
        // CET = UTC+1
        let winter = local_to_millis(d(2025, 1, 15), 7, 0, Brussels);
        assert_eq!(winter, d(2025, 1, 15).and_hms_opt(6, 0, 0).unwrap().and_utc().timestamp_millis());
        // CEST = UTC+2
        let summer = local_to_millis(d(2025, 7, 15), 7, 0, Brussels);
        assert_eq!(summer, d(2025, 7, 15).and_hms_opt(5, 0, 0).unwrap().and_utc().timestamp_millis());
    }

    #[test]
    fn test_day_of_week_sunday_zero() {
        assert_eq!(day_of_week(d(2025, 3, 2)), 0); // Sunday
        assert_eq!(day_of_week(d(2025, 3, 1)), 6); // Saturday
        assert_eq!(day_of_week(d(2025, 3, 3)), 1);
    }

    #[test]
    fn test_preference_deadline() {
        // 21 days before 1 April 2025 = 11 March 2025, 00:00 CET
        let deadline = preference_deadline(4, 2025, 21, Brussels).unwrap();
        assert_eq!(deadline, local_to_millis(d(2025, 3, 11), 0, 0, Brussels));
        assert_eq!(format_local(deadline, Brussels, "%d-%m-%Y %H:%M"), "11-03-2025 00:00");
    }

    #[test]
    fn test_deadline_info_open_and_closed() {
        let deadline = preference_deadline(4, 2025, 21, Brussels).unwrap();
        let open = deadline_info(4, 2025, 21, deadline - DAY_MS - 1, Brussels).unwrap();
        assert!(open.is_open);
        assert_eq!(open.days_left, 2);

        let closed = deadline_info(4, 2025, 21, deadline, Brussels).unwrap();
        assert!(!closed.is_open);
        assert_eq!(closed.days_left, 0);
    }

    #[test]
    fn test_deadline_warning_date() {
        assert_eq!(deadline_warning_date(4, 2025, 21, 3), Some(d(2025, 3, 8)));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(2, 2024), Some((d(2024, 2, 1), d(2024, 2, 29))));
        assert_eq!(month_bounds(13, 2024), None);
    }

    #[test]
    fn test_duration_until_next_local() {
        let now = Brussels.with_ymd_and_hms(2025, 3, 10, 8, 30, 0).unwrap();
        assert_eq!(
            duration_until_next_local(now, 9, 0),
            std::time::Duration::from_secs(30 * 60)
        );
        let after = Brussels.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(
            duration_until_next_local(after, 9, 0),
            std::time::Duration::from_secs(24 * 3600)
        );
    }
}
