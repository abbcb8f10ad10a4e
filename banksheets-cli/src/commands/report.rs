//! Report command - committed transactions out as CSV

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use banksheets_core::services::LogEvent;
use banksheets_core::{DescriptionPattern, ReportFilter};

use super::{get_context, get_logger, log_event};
use crate::output;

fn parse_date(flag: &str, raw: Option<&str>) -> Result<Option<NaiveDate>> {
    raw.map(|value| {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .with_context(|| format!("--{} expects YYYY-MM-DD, got '{}'", flag, value))
    })
    .transpose()
}

pub fn run(
    start: Option<&str>,
    end: Option<&str>,
    description: Option<String>,
    output_path: Option<&Path>,
) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("report"));

    let filter = ReportFilter {
        start: parse_date("start", start)?,
        end: parse_date("end", end)?,
        description: description.map(DescriptionPattern::new),
    };

    let ctx = get_context()?;

    match output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = ctx.report_service.write_csv(&filter, BufWriter::new(file))?;
            output::success(&format!("Wrote {} transaction(s) to {}", rows, path.display()));
        }
        None => {
            let stdout = std::io::stdout();
            ctx.report_service.write_csv(&filter, stdout.lock())?;
        }
    }

    Ok(())
}
