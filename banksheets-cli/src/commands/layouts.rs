//! Layouts command - list the export layouts the importer recognizes

use anyhow::{Context, Result};

use banksheets_core::config::Config;
use banksheets_core::services::LogEvent;

use super::{get_data_dir, get_logger, log_event};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(&logger, LogEvent::new("command_executed").with_command("layouts"));

    // Layouts only need settings, not the ledger database
    let data_dir = get_data_dir()?;
    let config = Config::load(&data_dir)?;
    let registry = config
        .layout_registry()
        .context("Invalid layout in settings.json")?;

    if json {
        println!("{}", serde_json::to_string_pretty(registry.layouts())?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Layout", "Header", "Mapping"]);

    for layout in registry.layouts() {
        let mapping = layout
            .mapping()
            .iter()
            .map(|(header, field)| format!("{} -> {}", header, field))
            .collect::<Vec<_>>()
            .join("\n");

        table.add_row(vec![
            layout.name.clone(),
            layout.signature().join(","),
            mapping,
        ]);
    }

    println!("{}", table);
    Ok(())
}
