//! Per-user monthly statistics

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use shared::models::{Overtime, Shift, ShiftType, User};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct UserStatistics {
    pub user_id: i64,
    pub name: String,
    pub planned_hours: f64,
    pub day_shifts: u32,
    pub night_shifts: u32,
    pub split_shifts: u32,
    pub overtime_minutes: i64,
    pub preferences_submitted: i64,
    pub min_hours: i32,
    pub preferred_hours: i32,
    pub max_hours: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StationStatistics {
    pub month: i32,
    pub year: i32,
    pub total_shifts: usize,
    pub open_shifts: usize,
    pub users: Vec<UserStatistics>,
}

pub fn compute(
    month: i32,
    year: i32,
    users: &[User],
    shifts: &[Shift],
    overtime: &[Overtime],
    preference_counts: &HashMap<i64, i64>,
) -> StationStatistics {
    let mut by_user: BTreeMap<i64, UserStatistics> = users
        .iter()
        .map(|u| {
            (
                u.id,
                UserStatistics {
                    user_id: u.id,
                    name: u.full_name(),
                    preferences_submitted: preference_counts.get(&u.id).copied().unwrap_or(0),
                    min_hours: u.min_hours,
                    preferred_hours: u.preferred_hours,
                    max_hours: u.max_hours,
                    ..Default::default()
                },
            )
        })
        .collect();

    let mut open_shifts = 0;
    for shift in shifts {
        let Some(user_id) = shift.user_id else {
            open_shifts += 1;
            continue;
        };
        let Some(stats) = by_user.get_mut(&user_id) else {
            continue;
        };
        stats.planned_hours += (shift.end_time - shift.start_time) as f64 / 3_600_000.0;
        match shift.shift_type {
            ShiftType::Day => stats.day_shifts += 1,
            ShiftType::Night => stats.night_shifts += 1,
        }
        if shift.is_split_shift {
            stats.split_shifts += 1;
        }
    }

    for entry in overtime {
        if let Some(stats) = by_user.get_mut(&entry.user_id) {
            stats.overtime_minutes += i64::from(entry.duration_minutes);
        }
    }

    StationStatistics {
        month,
        year,
        total_shifts: shifts.len(),
        open_shifts,
        users: by_user.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::models::{Role, ShiftStatus};

    fn user(id: i64) -> User {
        User {
            id,
            station_id: 1,
            username: format!("u{id}"),
            password_hash: String::new(),
            first_name: "U".into(),
            last_name: id.to_string(),
            email: None,
            role: Role::Ambulancier,
            is_active: true,
            min_hours: 0,
            max_hours: 160,
            preferred_hours: 100,
            dark_mode: false,
            shift_reminder_hours: 12,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn shift(user_id: Option<i64>, hours: i64, shift_type: ShiftType, split: bool) -> Shift {
        Shift {
            id: 0,
            station_id: 1,
            user_id,
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            start_time: 0,
            end_time: hours * 3_600_000,
            shift_type,
            status: ShiftStatus::for_assignment(user_id),
            is_split_shift: split,
            month: 3,
            year: 2025,
            is_emergency_scheduling: false,
            emergency_reason: None,
            reminder_sent_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_compute_statistics() {
        let users = vec![user(1), user(2)];
        let shifts = vec![
            shift(Some(1), 12, ShiftType::Day, false),
            shift(Some(1), 4, ShiftType::Night, true),
            shift(Some(2), 12, ShiftType::Night, false),
            shift(None, 8, ShiftType::Night, true),
        ];
        let overtime = vec![Overtime {
            id: 1,
            user_id: 2,
            shift_id: Some(3),
            station_id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            start_time: 0,
            duration_minutes: 45,
            reason: "x".into(),
            month: 3,
            year: 2025,
            created_at: 0,
            updated_at: 0,
        }];
        let prefs = HashMap::from([(1, 20)]);

        let stats = compute(3, 2025, &users, &shifts, &overtime, &prefs);
        assert_eq!(stats.total_shifts, 4);
        assert_eq!(stats.open_shifts, 1);

        let u1 = &stats.users[0];
        assert_eq!(u1.user_id, 1);
        assert_eq!(u1.planned_hours, 16.0);
        assert_eq!((u1.day_shifts, u1.night_shifts, u1.split_shifts), (1, 1, 1));
        assert_eq!(u1.preferences_submitted, 20);

        let u2 = &stats.users[1];
        assert_eq!(u2.planned_hours, 12.0);
        assert_eq!(u2.overtime_minutes, 45);
        assert_eq!(u2.preferences_submitted, 0);
    }
}
