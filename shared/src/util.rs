use chrono::{Datelike, NaiveDate};

/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Dutch month name, lowercase (`januari` .. `december`)
pub fn dutch_month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "januari",
        "februari",
        "maart",
        "april",
        "mei",
        "juni",
        "juli",
        "augustus",
        "september",
        "oktober",
        "november",
        "december",
    ];
    NAMES
        .get((month as usize).wrapping_sub(1))
        .copied()
        .unwrap_or("")
}

/// Dutch month name with a capital first letter (`Maart`)
pub fn dutch_month_name_capitalized(month: u32) -> String {
    let name = dutch_month_name(month);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Number of days in a month, `None` for an invalid month
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some(next.signed_duration_since(first).num_days() as u32)
}

/// Whether `date` falls in the given month
pub fn date_in_month(date: NaiveDate, month: i32, year: i32) -> bool {
    date.year() == year && date.month() as i32 == month
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dutch_month_names() {
        assert_eq!(dutch_month_name(1), "januari");
        assert_eq!(dutch_month_name(3), "maart");
        assert_eq!(dutch_month_name(12), "december");
        assert_eq!(dutch_month_name(0), "");
        assert_eq!(dutch_month_name(13), "");
        assert_eq!(dutch_month_name_capitalized(5), "Mei");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2025, 2), Some(28));
        assert_eq!(days_in_month(2025, 12), Some(31));
        assert_eq!(days_in_month(2025, 4), Some(30));
        assert_eq!(days_in_month(2025, 13), None);
    }

    #[test]
    fn test_date_in_month() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert!(date_in_month(d, 3, 2025));
        assert!(!date_in_month(d, 4, 2025));
    }
}
