//! Monthly schedule generation
//!
//! Pure and deterministic: the same input always yields the same plan.
//! Candidates for a slot are taken in order of hours assigned so far (ties by
//! user id) as long as the slot still fits under their monthly maximum.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use chrono_tz::Tz;
use shared::models::{PreferenceType, ShiftPreference, ShiftType, WeekdayConfig};

use super::calendar::{day_of_week, local_to_millis, month_bounds};

/// A station member eligible for planning
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub user_id: i64,
    pub max_hours: i32,
}

pub struct GeneratorInput<'a> {
    pub month: u32,
    pub year: i32,
    pub users: &'a [Candidate],
    pub preferences: &'a [ShiftPreference],
    /// Missing weekdays fall back to [`WeekdayConfig::default_for`]
    pub weekday_configs: &'a [WeekdayConfig],
    /// Active holidays; nights on these dates use the full-night strategy
    pub holidays: &'a HashSet<NaiveDate>,
    pub tz: Tz,
}

/// One shift of the generated plan; `user_id = None` is an open shift
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedShift {
    pub user_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: i64,
    pub end_time: i64,
    pub shift_type: ShiftType,
    pub is_split_shift: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Day,
    FullNight,
    FirstHalf,
    SecondHalf,
}

impl Slot {
    fn hours(self) -> i64 {
        match self {
            Slot::Day | Slot::FullNight => 12,
            Slot::FirstHalf => 4,
            Slot::SecondHalf => 8,
        }
    }

    fn shift_type(self) -> ShiftType {
        match self {
            Slot::Day => ShiftType::Day,
            _ => ShiftType::Night,
        }
    }

    fn is_split(self) -> bool {
        matches!(self, Slot::FirstHalf | Slot::SecondHalf)
    }

    /// (start_hour, end_hour, ends next day)
    fn window(self) -> (u32, u32, bool) {
        match self {
            Slot::Day => (7, 19, false),
            Slot::FullNight => (19, 7, true),
            Slot::FirstHalf => (19, 23, false),
            Slot::SecondHalf => (23, 7, true),
        }
    }
}

struct Planner<'a> {
    users: &'a [Candidate],
    /// user -> (date, type) -> preference
    preferences: HashMap<i64, HashMap<(NaiveDate, ShiftType), PreferenceType>>,
    assigned_hours: HashMap<i64, i64>,
    tz: Tz,
    out: Vec<PlannedShift>,
}

impl<'a> Planner<'a> {
    fn new(input: &GeneratorInput<'a>) -> Self {
        let mut preferences: HashMap<i64, HashMap<_, _>> = HashMap::new();
        for pref in input.preferences {
            if pref.month != input.month as i32 || pref.year != input.year {
                continue;
            }
            preferences
                .entry(pref.user_id)
                .or_default()
                .insert((pref.date, pref.shift_type), pref.preference_type);
        }
        Self {
            users: input.users,
            preferences,
            assigned_hours: input.users.iter().map(|u| (u.user_id, 0)).collect(),
            tz: input.tz,
            out: Vec::new(),
        }
    }

    fn is_available(&self, user_id: i64, date: NaiveDate, slot: Slot) -> bool {
        // No preferences submitted: available everywhere
        let Some(prefs) = self.preferences.get(&user_id) else {
            return true;
        };
        let pref = prefs.get(&(date, slot.shift_type())).copied();
        match slot {
            Slot::Day => matches!(pref, Some(p) if p != PreferenceType::Unavailable),
            Slot::FullNight => pref == Some(PreferenceType::Full),
            Slot::FirstHalf => {
                matches!(pref, Some(PreferenceType::Full | PreferenceType::First))
            }
            Slot::SecondHalf => {
                matches!(pref, Some(PreferenceType::Full | PreferenceType::Second))
            }
        }
    }

    /// Assign up to `count` users to `slot`, skipping and extending `excluded`
    fn fill(
        &mut self,
        date: NaiveDate,
        slot: Slot,
        count: usize,
        excluded: &mut HashSet<i64>,
    ) -> usize {
        let hours = slot.hours();
        let mut candidates: Vec<Candidate> = self
            .users
            .iter()
            .filter(|u| !excluded.contains(&u.user_id))
            .filter(|u| self.is_available(u.user_id, date, slot))
            .copied()
            .collect();
        candidates.sort_by_key(|u| {
            let hours = self.assigned_hours.get(&u.user_id).copied().unwrap_or(0);
            (hours, u.user_id)
        });

        let mut filled = 0;
        for candidate in candidates {
            if filled >= count {
                break;
            }
            let current = self.assigned_hours.get(&candidate.user_id).copied().unwrap_or(0);
            if current + hours > i64::from(candidate.max_hours) {
                continue;
            }
            self.assigned_hours.insert(candidate.user_id, current + hours);
            excluded.insert(candidate.user_id);
            self.push(date, slot, Some(candidate.user_id));
            filled += 1;
        }
        filled
    }

    fn push(&mut self, date: NaiveDate, slot: Slot, user_id: Option<i64>) {
        let (start_hour, end_hour, next_day) = slot.window();
        let end_date = if next_day {
            date.succ_opt().unwrap_or(date)
        } else {
            date
        };
        self.out.push(PlannedShift {
            user_id,
            date,
            start_time: local_to_millis(date, start_hour, 0, self.tz),
            end_time: local_to_millis(end_date, end_hour, 0, self.tz),
            shift_type: slot.shift_type(),
            is_split_shift: slot.is_split(),
        });
    }

    fn push_open(&mut self, date: NaiveDate, slot: Slot, count: usize) {
        for _ in 0..count {
            self.push(date, slot, None);
        }
    }

    fn plan_day(&mut self, date: NaiveDate, config: &WeekdayConfig, full_nights: bool) {
        // Day workers are excluded from that night
        let mut busy: HashSet<i64> = HashSet::new();

        if config.enable_day_shifts {
            let count = config.day_shift_count.max(0) as usize;
            let filled = self.fill(date, Slot::Day, count, &mut busy);
            self.push_open(date, Slot::Day, count - filled);
        }

        if !config.enable_night_shifts {
            return;
        }
        let count = config.night_shift_count.max(0) as usize;

        if full_nights {
            let full = self.fill(date, Slot::FullNight, count, &mut busy);
            let missing = count - full;
            if missing > 0 {
                let first = self.fill(date, Slot::FirstHalf, missing, &mut busy);
                let second = self.fill(date, Slot::SecondHalf, missing, &mut busy);
                let covered = full + first.min(second);
                self.push_open(date, Slot::FullNight, count - covered);
            }
        } else {
            let first = self.fill(date, Slot::FirstHalf, count, &mut busy);
            self.push_open(date, Slot::FirstHalf, count - first);
            let second = self.fill(date, Slot::SecondHalf, count, &mut busy);
            self.push_open(date, Slot::SecondHalf, count - second);
        }
    }
}

/// Generate the plan for one station and month
pub fn generate_schedule(input: &GeneratorInput<'_>) -> Vec<PlannedShift> {
    let Some((first, last)) = month_bounds(input.month, input.year) else {
        return Vec::new();
    };

    let configs: HashMap<i32, &WeekdayConfig> = input
        .weekday_configs
        .iter()
        .map(|c| (c.day_of_week, c))
        .collect();

    let mut planner = Planner::new(input);
    for date in first.iter_days().take_while(|d| *d <= last) {
        let dow = day_of_week(date);
        let fallback;
        let config = match configs.get(&dow) {
            Some(c) => *c,
            None => {
                fallback = WeekdayConfig::default_for(0, dow);
                &fallback
            }
        };
        let full_nights = config.full_night_shifts || input.holidays.contains(&date);
        planner.plan_day(date, config, full_nights);
    }
    planner.out
}

/// Totals reported after a generation run
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct GenerationSummary {
    pub total: usize,
    pub planned: usize,
    pub open: usize,
    pub hours_by_user: BTreeMap<i64, i64>,
}

pub fn summarize(plan: &[PlannedShift]) -> GenerationSummary {
    let mut summary = GenerationSummary {
        total: plan.len(),
        ..Default::default()
    };
    for shift in plan {
        match shift.user_id {
            Some(user_id) => {
                summary.planned += 1;
                let hours = (shift.end_time - shift.start_time) / 3_600_000;
                *summary.hours_by_user.entry(user_id).or_insert(0) += hours;
            }
            None => summary.open += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Brussels;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn users(n: i64, max_hours: i32) -> Vec<Candidate> {
        (1..=n)
            .map(|user_id| Candidate { user_id, max_hours })
            .collect()
    }

    fn pref(user_id: i64, date: NaiveDate, shift_type: ShiftType, p: PreferenceType) -> ShiftPreference {
        use chrono::Datelike;
        ShiftPreference {
            id: 0,
            user_id,
            station_id: 1,
            date,
            shift_type,
            preference_type: p,
            month: date.month() as i32,
            year: date.year(),
            notes: None,
            created_at: 0,
        }
    }

    fn configs(full_nights_every_day: bool) -> Vec<WeekdayConfig> {
        (0..7)
            .map(|dow| WeekdayConfig {
                full_night_shifts: full_nights_every_day,
                ..WeekdayConfig::default_for(1, dow)
            })
            .collect()
    }

    fn run(
        users: &[Candidate],
        prefs: &[ShiftPreference],
        weekday_configs: &[WeekdayConfig],
        holidays: &HashSet<NaiveDate>,
        month: u32,
        year: i32,
    ) -> Vec<PlannedShift> {
        generate_schedule(&GeneratorInput {
            month,
            year,
            users,
            preferences: prefs,
            weekday_configs,
            holidays,
            tz: Brussels,
        })
    }

    fn on(plan: &[PlannedShift], date: NaiveDate) -> Vec<&PlannedShift> {
        plan.iter().filter(|s| s.date == date).collect()
    }

    #[test]
    fn test_deterministic() {
        let u = users(6, 160);
        let cfg = configs(false);
        let hol = HashSet::new();
        let a = run(&u, &[], &cfg, &hol, 3, 2025);
        let b = run(&u, &[], &cfg, &hol, 3, 2025);
        assert_eq!(a, b);
    }

    #[test]
    fn test_weekday_split_strategy_with_plenty_of_staff() {
        let plan = run(&users(10, 744), &[], &configs(false), &HashSet::new(), 3, 2025);
        // Monday 3 March 2025: 2 day + 2 first halves + 2 second halves
        let monday = on(&plan, d(2025, 3, 3));
        assert_eq!(monday.len(), 6);
        assert!(monday.iter().all(|s| s.user_id.is_some()));
        assert_eq!(monday.iter().filter(|s| s.is_split_shift).count(), 4);

        // One piece per user per day
        let ids: HashSet<i64> = monday.iter().filter_map(|s| s.user_id).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_weekend_full_nights() {
        let plan = run(&users(10, 744), &[], &configs(false), &HashSet::new(), 3, 2025);
        // Saturday 1 March 2025 uses the default full-night strategy
        let saturday = on(&plan, d(2025, 3, 1));
        assert_eq!(saturday.len(), 4);
        let nights: Vec<_> = saturday
            .iter()
            .filter(|s| s.shift_type == ShiftType::Night)
            .collect();
        assert_eq!(nights.len(), 2);
        assert!(nights.iter().all(|s| !s.is_split_shift));
        assert_eq!(nights[0].end_time - nights[0].start_time, 12 * 3_600_000);
        assert_eq!(
            nights[0].end_time,
            local_to_millis(d(2025, 3, 2), 7, 0, Brussels)
        );
    }

    #[test]
    fn test_day_workers_excluded_from_night() {
        // Two users only: both take the day slots, nights stay open
        let plan = run(&users(2, 744), &[], &configs(false), &HashSet::new(), 3, 2025);
        let monday = on(&plan, d(2025, 3, 3));
        let nights: Vec<_> = monday
            .iter()
            .filter(|s| s.shift_type == ShiftType::Night)
            .collect();
        assert_eq!(nights.len(), 4);
        assert!(nights.iter().all(|s| s.user_id.is_none()));
    }

    #[test]
    fn test_max_hours_cap() {
        let plan = run(&users(3, 24), &[], &configs(false), &HashSet::new(), 3, 2025);
        let summary = summarize(&plan);
        for hours in summary.hours_by_user.values() {
            assert!(*hours <= 24, "assigned {hours} > 24");
        }
        assert!(summary.open > 0);
        assert_eq!(summary.total, summary.planned + summary.open);
    }

    #[test]
    fn test_hours_are_balanced() {
        let plan = run(&users(8, 744), &[], &configs(false), &HashSet::new(), 3, 2025);
        let summary = summarize(&plan);
        let min = summary.hours_by_user.values().min().copied().unwrap();
        let max = summary.hours_by_user.values().max().copied().unwrap();
        assert!(max - min <= 24, "spread {min}..{max}");
    }

    #[test]
    fn test_availability_from_preferences() {
        let monday = d(2025, 3, 3);
        let prefs = vec![
            // User 1 unavailable for day, available for first half only
            pref(1, monday, ShiftType::Day, PreferenceType::Unavailable),
            pref(1, monday, ShiftType::Night, PreferenceType::First),
            // User 2 only second half
            pref(2, monday, ShiftType::Night, PreferenceType::Second),
        ];
        let cfg: Vec<WeekdayConfig> = (0..7)
            .map(|dow| WeekdayConfig {
                day_shift_count: 1,
                night_shift_count: 1,
                full_night_shifts: false,
                ..WeekdayConfig::default_for(1, dow)
            })
            .collect();
        let plan = run(&users(2, 744), &prefs, &cfg, &HashSet::new(), 3, 2025);
        let shifts = on(&plan, monday);

        let day = shifts.iter().find(|s| s.shift_type == ShiftType::Day).unwrap();
        assert_eq!(day.user_id, None);

        let first = shifts
            .iter()
            .find(|s| s.is_split_shift && s.end_time - s.start_time == 4 * 3_600_000)
            .unwrap();
        assert_eq!(first.user_id, Some(1));
        let second = shifts
            .iter()
            .find(|s| s.is_split_shift && s.end_time - s.start_time == 8 * 3_600_000)
            .unwrap();
        assert_eq!(second.user_id, Some(2));

        // Users with preferences are unavailable on dates they did not mention
        let tuesday = on(&plan, d(2025, 3, 4));
        assert!(tuesday.iter().all(|s| s.user_id.is_none()));
    }

    #[test]
    fn test_full_night_falls_back_to_halves() {
        let saturday = d(2025, 3, 1);
        let prefs = vec![
            pref(1, saturday, ShiftType::Night, PreferenceType::First),
            pref(2, saturday, ShiftType::Night, PreferenceType::Second),
            pref(3, saturday, ShiftType::Night, PreferenceType::First),
        ];
        let cfg: Vec<WeekdayConfig> = (0..7)
            .map(|dow| WeekdayConfig {
                enable_day_shifts: false,
                ..WeekdayConfig::default_for(1, dow)
            })
            .collect();
        let plan = run(&users(3, 744), &prefs, &cfg, &HashSet::new(), 3, 2025);
        let shifts = on(&plan, saturday);

        // 2 first halves (users 1, 3), 1 second half (user 2), 1 open full night
        let planned_first: Vec<_> = shifts
            .iter()
            .filter(|s| s.is_split_shift && s.end_time - s.start_time == 4 * 3_600_000)
            .collect();
        assert_eq!(planned_first.len(), 2);
        let planned_second: Vec<_> = shifts
            .iter()
            .filter(|s| s.is_split_shift && s.end_time - s.start_time == 8 * 3_600_000)
            .collect();
        assert_eq!(planned_second.len(), 1);
        let open_full: Vec<_> = shifts
            .iter()
            .filter(|s| s.user_id.is_none() && !s.is_split_shift)
            .collect();
        assert_eq!(open_full.len(), 1);
    }

    #[test]
    fn test_holiday_uses_full_night_strategy() {
        let monday = d(2025, 4, 21); // Easter Monday
        let holidays: HashSet<NaiveDate> = [monday].into_iter().collect();
        let plan = run(&users(10, 744), &[], &configs(false), &holidays, 4, 2025);
        let nights: Vec<_> = on(&plan, monday)
            .into_iter()
            .filter(|s| s.shift_type == ShiftType::Night)
            .collect();
        assert_eq!(nights.len(), 2);
        assert!(nights.iter().all(|s| !s.is_split_shift));
    }

    #[test]
    fn test_disabled_shifts_produce_nothing() {
        let cfg: Vec<WeekdayConfig> = (0..7)
            .map(|dow| WeekdayConfig {
                enable_day_shifts: false,
                enable_night_shifts: false,
                ..WeekdayConfig::default_for(1, dow)
            })
            .collect();
        assert!(run(&users(4, 744), &[], &cfg, &HashSet::new(), 3, 2025).is_empty());
    }

    #[test]
    fn test_shift_count_for_month_without_staff() {
        // March 2025: 10 weekend days (4 shifts), 21 weekdays (6 shifts)
        let plan = run(&[], &[], &configs(false), &HashSet::new(), 3, 2025);
        assert_eq!(plan.len(), 10 * 4 + 21 * 6);
        assert!(plan.iter().all(|s| s.user_id.is_none()));
    }

    #[test]
    fn test_invalid_month() {
        assert!(run(&users(2, 744), &[], &configs(false), &HashSet::new(), 13, 2025).is_empty());
    }
}
