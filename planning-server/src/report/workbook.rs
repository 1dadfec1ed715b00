//! xlsx rendering of report sheets

use std::collections::HashSet;

use rust_xlsxwriter::{Color, Format, Workbook, Worksheet, XlsxError};

use super::{Cell, RowStyle, Sheet};

/// Excel's limit on worksheet names
const MAX_SHEET_NAME: usize = 31;

const EMERGENCY_FILL: u32 = 0xFFC7CE;
const EMERGENCY_FONT: u32 = 0x9C0006;

/// Render the sheets, in order, into an in-memory workbook
pub fn render_workbook(sheets: &[Sheet]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let mut used = HashSet::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(unique_sheet_name(&sheet.name, &mut used))?;
        write_sheet(worksheet, sheet)?;
    }
    workbook.save_to_buffer()
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), XlsxError> {
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(sheet.header_color));
    let plain = Format::new();
    let emergency = Format::new()
        .set_font_color(Color::RGB(EMERGENCY_FONT))
        .set_background_color(Color::RGB(EMERGENCY_FILL));
    let total = Format::new().set_bold();

    for (index, column) in sheet.columns.iter().enumerate() {
        let col = index as u16;
        worksheet.set_column_width(col, column.width)?;
        worksheet.write_string_with_format(0, col, column.header, &header)?;
    }

    for (index, row) in sheet.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        let format = match row.style {
            RowStyle::Normal => &plain,
            RowStyle::Emergency => &emergency,
            RowStyle::Total => &total,
        };
        for (col, cell) in row.cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(text) => {
                    worksheet.write_string_with_format(row_num, col, text.as_str(), format)?
                }
                Cell::Number(number) => {
                    worksheet.write_number_with_format(row_num, col, *number, format)?
                }
            };
        }
    }
    Ok(())
}

/// Strip characters Excel refuses, cap the length and keep names unique
/// (case-insensitively) within the workbook.
fn unique_sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let base = if cleaned.is_empty() { "Station" } else { cleaned };

    let mut candidate: String = base.chars().take(MAX_SHEET_NAME).collect();
    let mut n = 2;
    while used.contains(&candidate.to_lowercase()) {
        let suffix = format!(" ({n})");
        let keep = MAX_SHEET_NAME - suffix.chars().count();
        candidate = base.chars().take(keep).collect::<String>() + &suffix;
        n += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    use crate::report::report_sheets;
    use crate::report::tests::Fixture;

    fn workbook_xml(bytes: Vec<u8>) -> (zip::ZipArchive<Cursor<Vec<u8>>>, String) {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        (archive, xml)
    }

    #[test]
    fn test_unique_sheet_name() {
        let mut used = HashSet::new();
        assert_eq!(unique_sheet_name("Westerlo", &mut used), "Westerlo");
        assert_eq!(unique_sheet_name("westerlo", &mut used), "westerlo (2)");
        assert_eq!(unique_sheet_name("Post A/B [nacht]", &mut used), "Post AB nacht");
        assert_eq!(unique_sheet_name("???", &mut used), "Station");

        let long = "Ambulancepost Herentals-Noord Campus";
        let first = unique_sheet_name(long, &mut used);
        assert_eq!(first.chars().count(), MAX_SHEET_NAME);
        let second = unique_sheet_name(long, &mut used);
        assert_eq!(second.chars().count(), MAX_SHEET_NAME);
        assert!(second.ends_with(" (2)"));
    }

    #[test]
    fn test_workbook_has_one_sheet_per_part() {
        let fixture = Fixture::new();
        let bytes = render_workbook(&report_sheets(&fixture.input())).unwrap();
        let (archive, xml) = workbook_xml(bytes);

        for name in ["Samenvatting", "Westerlo", "Geel", "Overuren"] {
            assert!(xml.contains(&format!("name=\"{name}\"")), "missing sheet {name}");
        }
        assert!(!xml.contains("name=\"Test\""));
        let sheets = archive
            .file_names()
            .filter(|n| n.starts_with("xl/worksheets/sheet"))
            .count();
        assert_eq!(sheets, 4);
    }

    #[test]
    fn test_workbook_without_overtime() {
        let mut fixture = Fixture::new();
        fixture.overtime.clear();
        let bytes = render_workbook(&report_sheets(&fixture.input())).unwrap();
        let (_, xml) = workbook_xml(bytes);
        assert!(!xml.contains("Overuren"));
    }
}
