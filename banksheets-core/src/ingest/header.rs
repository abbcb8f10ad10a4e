//! Header locator - finds the column header inside exports with preamble lines
//!
//! Bank exports prepend a variable number of summary lines before the real
//! table. The only stable signal is the row right before the first row whose
//! first field is a date.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::domain::result::{Error, Result};

/// Date shapes accepted when probing a first field
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Amounts, counts and reference numbers: never dates
fn numeric_token() -> &'static Regex {
    static NUMERIC: OnceLock<Regex> = OnceLock::new();
    NUMERIC.get_or_init(|| {
        Regex::new(r"^[(+-]?[$€£]?\d[\d,]*(\.\d+)?\)?$").expect("numeric token pattern is valid")
    })
}

/// The located header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLine {
    /// 0-based line index within the source
    pub index: usize,
    /// Column names as split from the line
    pub fields: Vec<String>,
}

/// Whether a field is shaped like a calendar date
pub fn looks_like_date(token: &str) -> bool {
    let token = token.trim().trim_matches('"').trim();
    if token.is_empty() || numeric_token().is_match(token) {
        return false;
    }

    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(token, fmt).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|fmt| NaiveDateTime::parse_from_str(token, fmt).is_ok())
}

/// Split one line into fields, honoring quotes
pub fn split_fields(line: &str, delimiter: u8) -> Vec<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    match reader.records().next() {
        Some(Ok(record)) => record.iter().map(str::to_string).collect(),
        _ => line
            .split(char::from(delimiter))
            .map(str::to_string)
            .collect(),
    }
}

/// Locate the header among raw lines.
///
/// The candidate is the most recent line whose first field is not a date;
/// the first date-led line confirms it. A date-led line with no candidate
/// before it, or running out of lines, fails with `NoHeaderFound`.
/// Whitespace-only lines are skipped.
pub fn locate_header<S: AsRef<str>>(lines: &[S], delimiter: u8) -> Result<HeaderLine> {
    let mut candidate: Option<HeaderLine> = None;

    for (index, line) in lines.iter().enumerate() {
        let mut line = line.as_ref();
        if index == 0 {
            line = line.trim_start_matches('\u{feff}');
        }
        if line.trim().is_empty() {
            continue;
        }

        let fields = split_fields(line, delimiter);
        let first = fields.first().map(String::as_str).unwrap_or_default();

        if looks_like_date(first) {
            return candidate.ok_or_else(|| {
                Error::NoHeaderFound(format!(
                    "line {} holds dated data before any header line",
                    index + 1
                ))
            });
        }

        candidate = Some(HeaderLine { index, fields });
    }

    Err(Error::NoHeaderFound(
        "no dated row follows a header-shaped line".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_probe_accepts_common_shapes() {
        for token in [
            "02/11/2021",
            "2/1/21",
            "2021-02-11",
            "2021/02/11",
            "11.02.2021",
            "11 Feb 2021",
            "Feb 11, 2021",
            "February 11, 2021",
            "2021-02-11T08:30:00",
            "\"02/11/2021\"",
        ] {
            assert!(looks_like_date(token), "expected date: {}", token);
        }
    }

    #[test]
    fn test_date_probe_rejects_numbers_and_text() {
        for token in [
            "",
            "12",
            "2021",
            "-10.02",
            "1,234.56",
            "(12.00)",
            "491091136970529302963377",
            "Posted Date",
            "Beginning balance as of 01/01/2021",
            "13/45/2021",
        ] {
            assert!(!looks_like_date(token), "expected non-date: {}", token);
        }
    }

    #[test]
    fn test_header_directly_before_data() {
        let lines = [
            "Posted Date,Reference Number,Payee,Address,Amount",
            "02/11/2021,491091136970529302963377,Popeyes,\"Frankfurt IL \",-10.02",
        ];

        let header = locate_header(&lines, b',').unwrap();
        assert_eq!(header.index, 0);
        assert_eq!(header.fields[2], "Payee");
    }

    #[test]
    fn test_header_after_summary_preamble() {
        let mut lines: Vec<String> = (0..10).map(|i| format!("Summary line {},,", i)).collect();
        lines.push("Date,Description,Amount,Running Bal.".to_string());
        lines.push("01/04/2021,RALLY,-13.59,100.00".to_string());

        let header = locate_header(&lines, b',').unwrap();
        assert_eq!(header.index, 10);
        assert_eq!(header.fields, vec!["Date", "Description", "Amount", "Running Bal."]);
    }

    #[test]
    fn test_data_before_any_header_fails() {
        let lines = [
            "\"01/04/2021\",\"-13.59\",\"*\",\"\",\"RALLY\"",
            "\"01/05/2021\",\"-2.00\",\"*\",\"\",\"COFFEE\"",
        ];

        assert!(matches!(
            locate_header(&lines, b','),
            Err(Error::NoHeaderFound(_))
        ));
    }

    #[test]
    fn test_no_dated_rows_fails() {
        let lines = ["Account summary", "Date,Description,Amount", "Total,,0.00"];
        assert!(matches!(
            locate_header(&lines, b','),
            Err(Error::NoHeaderFound(_))
        ));
    }

    #[test]
    fn test_empty_source_fails() {
        let lines: [&str; 0] = [];
        assert!(matches!(
            locate_header(&lines, b','),
            Err(Error::NoHeaderFound(_))
        ));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let lines = [
            "Description,,Summary Amt.",
            "Ending balance,,\"1,000.00\"",
            "",
            "Date,Description,Amount,Running Bal.",
            "   ",
            "01/04/2021,RALLY,-13.59,100.00",
        ];

        let header = locate_header(&lines, b',').unwrap();
        assert_eq!(header.index, 3);
    }

    #[test]
    fn test_bom_is_stripped() {
        let lines = ["\u{feff}Date,Description,Amount", "01/04/2021,RALLY,-13.59"];
        let header = locate_header(&lines, b',').unwrap();
        assert_eq!(header.fields[0], "Date");
    }

    #[test]
    fn test_custom_delimiter() {
        let lines = ["Date;Description;Amount", "2021-01-04;RALLY;-13,59"];
        let header = locate_header(&lines, b';').unwrap();
        assert_eq!(header.fields, vec!["Date", "Description", "Amount"]);
    }
}
