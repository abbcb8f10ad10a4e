//! Status command - show ledger status and summary

use anyhow::Result;
use colored::Colorize;
use comfy_table::{ContentArrangement, Table};

use banksheets_core::services::LogEvent;

use super::{get_context, get_logger, log_event};

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("status"));

    let ctx = get_context()?;
    let status = ctx.status_service.get_status()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Ledger Status".bold());
    println!();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.add_row(vec!["Descriptions", &status.total_descriptions.to_string()]);
    table.add_row(vec!["Transactions", &status.total_committed.to_string()]);
    table.add_row(vec!["Staged", &status.total_staged.to_string()]);

    println!("{}", table);
    println!();

    if let (Some(earliest), Some(latest)) = (&status.date_range.earliest, &status.date_range.latest) {
        println!("Date range: {} to {}", earliest, latest);
        println!();
    }

    if status.total_staged > 0 {
        println!(
            "{}",
            "Staged records from an unfinished insert will be reconciled by the next insert."
                .yellow()
        );
    }

    if let Some(path) = ctx.repository.db_path() {
        println!("{}", format!("Database: {}", path.display()).dimmed());
    }

    Ok(())
}
