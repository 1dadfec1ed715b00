//! Minimal CSV writer for spreadsheet exports
//!
//! Semicolon separated with a UTF-8 BOM, which is what Excel expects in
//! Dutch/Belgian locales.

const SEPARATOR: char = ';';
const BOM: &str = "\u{feff}";

pub struct CsvWriter {
    out: String,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            out: BOM.to_string(),
        }
    }

    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut first = true;
        for field in fields {
            if !first {
                self.out.push(SEPARATOR);
            }
            first = false;
            self.out.push_str(&escape(field.as_ref()));
        }
        self.out.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.out
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape(field: &str) -> String {
    if field.contains([SEPARATOR, '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_escaping() {
        let mut csv = CsvWriter::new();
        csv.row(["Datum", "Reden"]);
        csv.row(["01-03-2025", "ziekte; vervanging"]);
        csv.row(["02-03-2025", "zei \"ok\""]);
        let out = csv.finish();
        let body = out.strip_prefix('\u{feff}').unwrap();
        let lines: Vec<&str> = body.split("\r\n").collect();
        assert_eq!(lines[0], "Datum;Reden");
        assert_eq!(lines[1], "01-03-2025;\"ziekte; vervanging\"");
        assert_eq!(lines[2], "02-03-2025;\"zei \"\"ok\"\"\"");
        assert_eq!(lines[3], "");
    }
}
