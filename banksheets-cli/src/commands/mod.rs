//! CLI command implementations

pub mod alias;
pub mod insert;
pub mod layouts;
pub mod logs;
pub mod report;
pub mod status;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use banksheets_core::services::{LogEvent, LoggingService};
use banksheets_core::BanksheetsContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_data_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("BANKSHEETS_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".banksheets"))
        .ok_or_else(|| anyhow!("Could not find home directory; set BANKSHEETS_DIR"))
}

/// Open the ledger context
pub fn get_context() -> Result<BanksheetsContext> {
    let data_dir = get_data_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    BanksheetsContext::new(&data_dir).context("Failed to initialize banksheets context")
}
