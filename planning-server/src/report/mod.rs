//! Monthly shift report and statistics
//!
//! Rendering is pure: callers load the month's rows and pass them in.
//! Each report part is a [`Sheet`], written to the xlsx workbook that is
//! mailed out or to CSV for the per-station download.

pub mod csv;
pub mod statistics;
mod workbook;

use std::collections::{HashMap, HashSet};

use chrono_tz::Tz;
use shared::models::{OvertimeWithUser, Shift, ShiftStatus, ShiftType, Station};
use shared::util::dutch_month_name_capitalized;

use crate::scheduling::calendar::format_local;
use csv::CsvWriter;

pub use workbook::render_workbook;

pub const REPORT_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const UNKNOWN: &str = "Onbekend";

const SUMMARY_HEADER: u32 = 0x4472C4;
const OVERTIME_HEADER: u32 = 0x70AD47;

pub struct ReportInput<'a> {
    pub month: u32,
    pub year: i32,
    pub stations: &'a [Station],
    pub shifts: &'a [Shift],
    pub overtime: &'a [OvertimeWithUser],
    /// user id -> full name
    pub user_names: &'a HashMap<i64, String>,
    pub excluded_stations: &'a [i64],
    pub tz: Tz,
}

impl ReportInput<'_> {
    fn included_stations(&self) -> impl Iterator<Item = &Station> {
        self.stations
            .iter()
            .filter(|s| !self.excluded_stations.contains(&s.id))
    }

    fn user_name(&self, user_id: Option<i64>) -> &str {
        user_id
            .and_then(|id| self.user_names.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl Cell {
    fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    fn count(value: usize) -> Self {
        Cell::Number(value as f64)
    }

    pub fn to_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    Normal,
    /// Emergency-scheduled shift, highlighted red
    Emergency,
    /// Closing totals, bold
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub style: RowStyle,
}

impl Row {
    fn normal(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            style: RowStyle::Normal,
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(Cell::to_text).collect()
    }
}

pub struct Column {
    pub header: &'static str,
    pub width: f64,
}

const fn col(header: &'static str, width: f64) -> Column {
    Column { header, width }
}

const SUMMARY_COLUMNS: &[Column] = &[
    col("Station", 20.0),
    col("Totaal Shifts", 15.0),
    col("Dagdiensten", 15.0),
    col("Nachtdiensten", 15.0),
    col("Split Diensten", 15.0),
    col("Unieke Medewerkers", 20.0),
    col("Overuren (min)", 15.0),
    col("Overuren (uur)", 15.0),
];

const STATION_COLUMNS: &[Column] = &[
    col("Datum", 15.0),
    col("Medewerker", 25.0),
    col("Type", 12.0),
    col("Start", 10.0),
    col("Einde", 10.0),
    col("Split", 8.0),
    col("Status", 12.0),
    col("Noodinplanning", 15.0),
    col("Nood Reden", 40.0),
];

const OVERTIME_COLUMNS: &[Column] = &[
    col("Datum", 15.0),
    col("Station", 20.0),
    col("Medewerker", 25.0),
    col("Starttijd", 12.0),
    col("Duur (min)", 12.0),
    col("Duur (uur)", 12.0),
    col("Reden", 40.0),
];

/// One worksheet of the report
pub struct Sheet {
    pub name: String,
    pub columns: &'static [Column],
    /// Header fill as `0xRRGGBB`
    pub header_color: u32,
    pub rows: Vec<Row>,
}

impl Sheet {
    pub fn to_csv(&self) -> String {
        let mut csv = CsvWriter::new();
        csv.row(self.columns.iter().map(|c| c.header));
        for row in &self.rows {
            csv.row(row.texts());
        }
        csv.finish()
    }
}

/// `Shift_Rapportage_Maart_2025.xlsx`
pub fn report_filename(month: u32, year: i32) -> String {
    format!(
        "Shift_Rapportage_{}_{year}.xlsx",
        dutch_month_name_capitalized(month)
    )
}

/// Fill `{maand}` and `{jaar}` in a subject or body template
pub fn render_template(template: &str, month: u32, year: i32) -> String {
    template
        .replace("{maand}", &dutch_month_name_capitalized(month))
        .replace("{jaar}", &year.to_string())
}

fn hours_1dp(minutes: i64) -> String {
    format!("{:.1}", minutes as f64 / 60.0)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "Ja" } else { "Nee" }
}

/// Per-station totals
pub fn summary_sheet(input: &ReportInput<'_>) -> Sheet {
    let mut rows = Vec::new();
    for station in input.included_stations() {
        let shifts: Vec<&Shift> = input
            .shifts
            .iter()
            .filter(|s| s.station_id == station.id)
            .collect();
        let day = shifts.iter().filter(|s| s.shift_type == ShiftType::Day).count();
        let night = shifts.len() - day;
        let split = shifts.iter().filter(|s| s.is_split_shift).count();
        let unique: HashSet<i64> = shifts.iter().filter_map(|s| s.user_id).collect();
        let overtime_minutes: i64 = input
            .overtime
            .iter()
            .filter(|o| o.overtime.station_id == station.id)
            .map(|o| i64::from(o.overtime.duration_minutes))
            .sum();

        rows.push(Row::normal(vec![
            Cell::text(station.display_name.as_str()),
            Cell::count(shifts.len()),
            Cell::count(day),
            Cell::count(night),
            Cell::count(split),
            Cell::count(unique.len()),
            Cell::Number(overtime_minutes as f64),
            Cell::text(hours_1dp(overtime_minutes)),
        ]));
    }
    Sheet {
        name: "Samenvatting".to_string(),
        columns: SUMMARY_COLUMNS,
        header_color: SUMMARY_HEADER,
        rows,
    }
}

/// Shift listing for one station, ordered by date then start
pub fn station_sheet(input: &ReportInput<'_>, station: &Station) -> Sheet {
    let mut shifts: Vec<&Shift> = input
        .shifts
        .iter()
        .filter(|s| s.station_id == station.id)
        .collect();
    shifts.sort_by_key(|s| (s.date, s.start_time, s.id));

    let rows = shifts
        .into_iter()
        .map(|shift| Row {
            cells: vec![
                Cell::text(shift.date.format("%d-%m-%Y").to_string()),
                Cell::text(input.user_name(shift.user_id)),
                Cell::text(match shift.shift_type {
                    ShiftType::Day => "Dag",
                    ShiftType::Night => "Nacht",
                }),
                Cell::text(format_local(shift.start_time, input.tz, "%H:%M")),
                Cell::text(format_local(shift.end_time, input.tz, "%H:%M")),
                Cell::text(yes_no(shift.is_split_shift)),
                Cell::text(match shift.status {
                    ShiftStatus::Planned => "Gepland",
                    ShiftStatus::Open => "Open",
                }),
                Cell::text(yes_no(shift.is_emergency_scheduling)),
                Cell::text(shift.emergency_reason.clone().unwrap_or_default()),
            ],
            style: if shift.is_emergency_scheduling {
                RowStyle::Emergency
            } else {
                RowStyle::Normal
            },
        })
        .collect();

    Sheet {
        name: station.display_name.clone(),
        columns: STATION_COLUMNS,
        header_color: SUMMARY_HEADER,
        rows,
    }
}

/// All overtime of the month with a closing TOTAAL row.
/// `None` when nobody registered overtime.
pub fn overtime_sheet(input: &ReportInput<'_>) -> Option<Sheet> {
    let station_names: HashMap<i64, &str> = input
        .stations
        .iter()
        .map(|s| (s.id, s.display_name.as_str()))
        .collect();
    let mut entries: Vec<&OvertimeWithUser> = input
        .overtime
        .iter()
        .filter(|o| !input.excluded_stations.contains(&o.overtime.station_id))
        .collect();
    if entries.is_empty() {
        return None;
    }
    entries.sort_by_key(|o| (o.overtime.date, o.overtime.start_time));

    let mut rows = Vec::with_capacity(entries.len() + 2);
    let mut total: i64 = 0;
    for entry in entries {
        let minutes = i64::from(entry.overtime.duration_minutes);
        total += minutes;
        rows.push(Row::normal(vec![
            Cell::text(entry.overtime.date.format("%d-%m-%Y").to_string()),
            Cell::text(
                station_names
                    .get(&entry.overtime.station_id)
                    .copied()
                    .unwrap_or(UNKNOWN),
            ),
            Cell::text(format!("{} {}", entry.first_name, entry.last_name)),
            Cell::text(format_local(entry.overtime.start_time, input.tz, "%H:%M")),
            Cell::Number(minutes as f64),
            Cell::text(hours_1dp(minutes)),
            Cell::text(entry.overtime.reason.as_str()),
        ]));
    }
    rows.push(Row::normal(Vec::new()));
    rows.push(Row {
        cells: vec![
            Cell::text("TOTAAL"),
            Cell::text(""),
            Cell::text(""),
            Cell::text(""),
            Cell::Number(total as f64),
            Cell::text(hours_1dp(total)),
            Cell::text(""),
        ],
        style: RowStyle::Total,
    });

    Some(Sheet {
        name: "Overuren".to_string(),
        columns: OVERTIME_COLUMNS,
        header_color: OVERTIME_HEADER,
        rows,
    })
}

/// Summary, one sheet per included station, then overtime if any
pub fn report_sheets(input: &ReportInput<'_>) -> Vec<Sheet> {
    let mut sheets = vec![summary_sheet(input)];
    sheets.extend(
        input
            .included_stations()
            .map(|station| station_sheet(input, station)),
    );
    sheets.extend(overtime_sheet(input));
    sheets
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;
    use chrono_tz::Europe::Brussels;
    use shared::models::Overtime;

    use crate::scheduling::calendar::local_to_millis;

    fn station(id: i64, name: &str) -> Station {
        Station {
            id,
            name: name.to_lowercase(),
            code: name.to_uppercase(),
            display_name: name.to_string(),
            created_at: 0,
        }
    }

    fn shift(id: i64, station_id: i64, user_id: Option<i64>, day: u32, shift_type: ShiftType) -> Shift {
        let date = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
        let (start_h, end_date) = match shift_type {
            ShiftType::Day => (7, date),
            ShiftType::Night => (19, date.succ_opt().unwrap()),
        };
        Shift {
            id,
            station_id,
            user_id,
            date,
            start_time: local_to_millis(date, start_h, 0, Brussels),
            end_time: local_to_millis(end_date, (start_h + 12) % 24, 0, Brussels),
            shift_type,
            status: ShiftStatus::for_assignment(user_id),
            is_split_shift: false,
            month: 3,
            year: 2025,
            is_emergency_scheduling: false,
            emergency_reason: None,
            reminder_sent_at: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn overtime(station_id: i64, minutes: i32) -> OvertimeWithUser {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        OvertimeWithUser {
            overtime: Overtime {
                id: 1,
                user_id: 10,
                shift_id: Some(1),
                station_id,
                date,
                start_time: local_to_millis(date, 19, 0, Brussels),
                duration_minutes: minutes,
                reason: "Late interventie".into(),
                month: 3,
                year: 2025,
                created_at: 0,
                updated_at: 0,
            },
            first_name: "Jan".into(),
            last_name: "Peeters".into(),
        }
    }

    pub(crate) struct Fixture {
        pub stations: Vec<Station>,
        pub shifts: Vec<Shift>,
        pub overtime: Vec<OvertimeWithUser>,
        pub names: HashMap<i64, String>,
        pub excluded: Vec<i64>,
    }

    impl Fixture {
        pub fn new() -> Self {
            let mut emergency = shift(3, 1, Some(11), 2, ShiftType::Day);
            emergency.is_emergency_scheduling = true;
            emergency.emergency_reason = Some("Ziekte".into());
            Self {
                stations: vec![station(1, "Westerlo"), station(2, "Geel"), station(8, "Test")],
                shifts: vec![
                    shift(1, 1, Some(10), 1, ShiftType::Day),
                    shift(2, 1, None, 1, ShiftType::Night),
                    emergency,
                    shift(4, 2, Some(12), 1, ShiftType::Night),
                    shift(5, 8, Some(13), 1, ShiftType::Day),
                ],
                overtime: vec![overtime(1, 90), overtime(2, 30)],
                names: HashMap::from([
                    (10, "Jan Peeters".to_string()),
                    (11, "An Claes".to_string()),
                    (12, "Tom Wouters".to_string()),
                ]),
                excluded: vec![8],
            }
        }

        pub fn input(&self) -> ReportInput<'_> {
            ReportInput {
                month: 3,
                year: 2025,
                stations: &self.stations,
                shifts: &self.shifts,
                overtime: &self.overtime,
                user_names: &self.names,
                excluded_stations: &self.excluded,
                tz: Brussels,
            }
        }
    }

    #[test]
    fn test_filename_and_template() {
        assert_eq!(report_filename(3, 2025), "Shift_Rapportage_Maart_2025.xlsx");
        assert_eq!(
            render_template("Rapportage - {maand} {jaar}", 12, 2024),
            "Rapportage - December 2024"
        );
    }

    #[test]
    fn test_summary_counts_and_exclusion() {
        let fixture = Fixture::new();
        let sheet = summary_sheet(&fixture.input());
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(
            sheet.rows[0].texts(),
            ["Westerlo", "3", "2", "1", "0", "2", "90", "1.5"]
        );
        assert_eq!(sheet.rows[1].texts(), ["Geel", "1", "0", "1", "0", "1", "30", "0.5"]);
        assert_eq!(sheet.rows[0].cells[1], Cell::Number(3.0));
    }

    #[test]
    fn test_station_rows_and_emergency_style() {
        let fixture = Fixture::new();
        let sheet = station_sheet(&fixture.input(), &fixture.stations[0]);
        assert_eq!(sheet.name, "Westerlo");
        assert_eq!(
            sheet.rows[0].texts(),
            ["01-03-2025", "Jan Peeters", "Dag", "07:00", "19:00", "Nee", "Gepland", "Nee", ""]
        );
        assert_eq!(
            sheet.rows[1].texts(),
            ["01-03-2025", "Onbekend", "Nacht", "19:00", "07:00", "Nee", "Open", "Nee", ""]
        );
        assert_eq!(sheet.rows[2].texts()[7..], ["Ja", "Ziekte"]);
        assert_eq!(sheet.rows[2].style, RowStyle::Emergency);
        assert_eq!(sheet.rows[0].style, RowStyle::Normal);
    }

    #[test]
    fn test_station_sheet_as_csv() {
        let fixture = Fixture::new();
        let csv = station_sheet(&fixture.input(), &fixture.stations[0]).to_csv();
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').split("\r\n").collect();
        assert_eq!(
            lines[0],
            "Datum;Medewerker;Type;Start;Einde;Split;Status;Noodinplanning;Nood Reden"
        );
        assert_eq!(lines[3], "02-03-2025;An Claes;Dag;07:00;19:00;Nee;Gepland;Ja;Ziekte");
    }

    #[test]
    fn test_overtime_total_row() {
        let fixture = Fixture::new();
        let sheet = overtime_sheet(&fixture.input()).unwrap();
        assert_eq!(
            sheet.rows[0].texts(),
            ["04-03-2025", "Westerlo", "Jan Peeters", "19:00", "90", "1.5", "Late interventie"]
        );
        assert!(sheet.rows[2].cells.is_empty());
        let total = sheet.rows.last().unwrap();
        assert_eq!(total.style, RowStyle::Total);
        assert_eq!(total.texts(), ["TOTAAL", "", "", "", "120", "2.0", ""]);
    }

    #[test]
    fn test_overtime_sheet_omitted_without_overtime() {
        let mut fixture = Fixture::new();
        fixture.overtime.clear();
        assert!(overtime_sheet(&fixture.input()).is_none());

        let names: Vec<String> = report_sheets(&fixture.input())
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["Samenvatting", "Westerlo", "Geel"]);
    }

    #[test]
    fn test_overtime_of_excluded_station_only_omits_sheet() {
        let mut fixture = Fixture::new();
        fixture.overtime = vec![overtime(8, 45)];
        assert!(overtime_sheet(&fixture.input()).is_none());
    }

    #[test]
    fn test_overtime_kept_after_shift_removed() {
        let mut fixture = Fixture::new();
        fixture.overtime[0].overtime.shift_id = None;
        fixture.shifts.retain(|s| s.id != 1);
        let sheet = overtime_sheet(&fixture.input()).unwrap();
        assert_eq!(sheet.rows[0].texts()[..3], ["04-03-2025", "Westerlo", "Jan Peeters"]);
        assert_eq!(sheet.rows.last().unwrap().texts()[4], "120");
    }

    #[test]
    fn test_report_sheet_order() {
        let fixture = Fixture::new();
        let names: Vec<String> = report_sheets(&fixture.input())
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, ["Samenvatting", "Westerlo", "Geel", "Overuren"]);
    }
}
