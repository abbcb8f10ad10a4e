//! CSV ingestion: header location, layout mapping and record building
//!
//! [`SourceParser`] runs one source's text through the three stages and
//! collects row-level failures as [`Diagnostic`]s. File-level failures
//! (`NoHeaderFound`, `UnknownLayout`) are returned as errors; the import
//! service turns those into diagnostics too.

mod builder;
mod header;
mod layout;

pub use builder::{parse_amount, RecordBuilder, DEFAULT_DATE_FORMAT};
pub use header::{locate_header, looks_like_date, split_fields, HeaderLine};
pub use layout::{Layout, LayoutColumn, LayoutRegistry};

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::CanonicalRecord;

/// A recovered failure tied to a source and, for rows, a 1-based line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub source: String,
    pub line: Option<usize>,
    pub kind: &'static str,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(source: impl Into<String>, line: Option<usize>, error: &Error) -> Self {
        let message = match error {
            Error::NoHeaderFound(m)
            | Error::UnknownLayout(m)
            | Error::MalformedRecord(m) => m.clone(),
            other => other.to_string(),
        };

        Self {
            source: source.into(),
            line,
            kind: error.kind(),
            message,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}: {}", self.source, line, self.kind, self.message),
            None => write!(f, "{}: {}: {}", self.source, self.kind, self.message),
        }
    }
}

/// Result of parsing one source
#[derive(Debug, Clone, Serialize)]
pub struct ParsedSource {
    pub source: String,
    pub layout: String,
    /// 1-based line number of the header
    pub header_line: usize,
    pub records: Vec<CanonicalRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Header locator, field mapper and record builder bound to one configuration
#[derive(Debug, Clone)]
pub struct SourceParser {
    registry: LayoutRegistry,
    builder: RecordBuilder,
    delimiter: u8,
}

impl SourceParser {
    pub fn new(registry: LayoutRegistry, builder: RecordBuilder, delimiter: u8) -> Self {
        Self {
            registry,
            builder,
            delimiter,
        }
    }

    /// Parse the full text of one source
    pub fn parse(&self, source: &str, contents: &str) -> Result<ParsedSource> {
        let raw_lines: Vec<&str> = contents.split_inclusive('\n').collect();
        let lines: Vec<&str> = raw_lines
            .iter()
            .map(|l| l.trim_end_matches(['\r', '\n']))
            .collect();

        let header = locate_header(&lines, self.delimiter)?;
        let layout = self.registry.lookup(&header.fields)?;

        let offset: usize = raw_lines[..=header.index].iter().map(|l| l.len()).sum();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(contents[offset..].as_bytes());

        let mut records = Vec::new();
        let mut diagnostics = Vec::new();

        for row in reader.records() {
            let (line, outcome) = match row {
                Ok(row) => {
                    let line = row.position().map(|p| header.index + 1 + p.line() as usize);
                    if row.iter().all(|field| field.trim().is_empty()) {
                        continue;
                    }
                    (line, self.builder.build(&layout.map_row(row.iter())))
                }
                Err(e) => {
                    let line = e.position().map(|p| header.index + 1 + p.line() as usize);
                    (line, Err(Error::malformed(e.to_string())))
                }
            };

            match outcome {
                Ok(record) => records.push(record),
                Err(e) => diagnostics.push(Diagnostic::from_error(source, line, &e)),
            }
        }

        Ok(ParsedSource {
            source: source.to_string(),
            layout: layout.name.clone(),
            header_line: header.index + 1,
            records,
            diagnostics,
        })
    }
}

impl Default for SourceParser {
    fn default() -> Self {
        Self::new(LayoutRegistry::builtin(), RecordBuilder::default(), b',')
    }
}
