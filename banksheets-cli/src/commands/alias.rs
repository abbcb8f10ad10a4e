//! Alias command - friendly names for raw bank descriptions

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use banksheets_core::services::{AliasResult, LogEvent};

use super::{get_context, get_logger, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum AliasCommands {
    /// List descriptions that have no alias yet
    Missing {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an alias to every matching description
    Create {
        /// Description to match; % and _ are wildcards
        #[arg(long)]
        description: String,
        /// Alias to add
        #[arg(long)]
        name: String,
    },
    /// Replace all aliases of every matching description
    Replace {
        /// Description to match; % and _ are wildcards
        #[arg(long)]
        description: String,
        /// Alias that replaces the existing ones
        #[arg(long)]
        name: String,
    },
}

pub fn run(command: AliasCommands) -> Result<()> {
    let logger = get_logger();
    let ctx = get_context()?;

    match command {
        AliasCommands::Missing { json } => {
            log_event(&logger, LogEvent::new("command_executed").with_command("alias missing"));
            let missing = ctx.alias_service.missing()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&missing)?);
                return Ok(());
            }

            if missing.is_empty() {
                output::success("Every description has an alias.");
                return Ok(());
            }

            println!("{}", format!("{} description(s) without an alias", missing.len()).bold());
            for description in &missing {
                println!("  {}", description.name);
            }
        }
        AliasCommands::Create { description, name } => {
            log_event(&logger, LogEvent::new("command_executed").with_command("alias create"));
            let result = ctx.alias_service.create(&description, &name)?;
            print_result("Added", &result);
        }
        AliasCommands::Replace { description, name } => {
            log_event(&logger, LogEvent::new("command_executed").with_command("alias replace"));
            let result = ctx.alias_service.replace(&description, &name)?;
            print_result("Set", &result);
        }
    }

    Ok(())
}

fn print_result(verb: &str, result: &AliasResult) {
    output::success(&format!(
        "{} alias '{}' on {} description(s)",
        verb, result.alias, result.changed
    ));
    for name in &result.matched {
        println!("  {}", name.dimmed());
    }
}
