//! Banksheets CLI - bank statement ledger in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{alias, insert, layouts, logs, report, status};

/// Banksheets - bank statement ledger in your terminal
#[derive(Parser)]
#[command(name = "banksheets", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import bank exports and reconcile duplicates into the ledger
    Insert {
        /// CSV file, or directory of CSV files
        source: PathBuf,
        /// Resolve duplicates automatically instead of prompting
        #[arg(long)]
        skip_duplicates: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage description aliases
    Alias {
        #[command(subcommand)]
        command: alias::AliasCommands,
    },

    /// Write committed transactions as CSV
    Report {
        /// First date to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last date to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Description filter; % and _ are wildcards
        #[arg(long)]
        description: Option<String>,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show ledger status and summary
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the known export layouts
    Layouts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Insert { source, skip_duplicates, json } => insert::run(&source, skip_duplicates, json),
        Commands::Alias { command } => alias::run(command),
        Commands::Report { start, end, description, output } => {
            report::run(start.as_deref(), end.as_deref(), description, output.as_deref())
        }
        Commands::Status { json } => status::run(json),
        Commands::Layouts { json } => layouts::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
