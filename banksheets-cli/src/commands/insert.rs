//! Insert command - import bank exports and reconcile them into the ledger

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use dialoguer::Input;

use banksheets_core::services::{
    prompt_text, AutomaticResolver, ImportBatch, InteractiveResolver, LogEvent, ReconcileReport,
    ResponseSource,
};
use banksheets_core::domain::result::Result as CoreResult;
use banksheets_core::{DuplicateGroup, Error};

use super::{get_context, get_logger, log_event};
use crate::output;

/// Asks for keep counts on the terminal
struct TerminalResponses;

impl ResponseSource for TerminalResponses {
    fn ask(&mut self, group: &DuplicateGroup) -> CoreResult<Option<String>> {
        eprintln!();
        let key = &group.key;
        eprintln!("{} {}", "Duplicate:".yellow().bold(), key.description());
        eprintln!("  Date:              {}", key.date().format("%m/%d/%Y"));
        eprintln!("  Amount:            {}", key.amount());
        eprintln!("  Already in ledger: {}", group.committed_count);
        eprintln!("  New copies:        {}", group.entry_count());

        // Ctrl-D, a closed stdin or a non-terminal session end the batch
        let answer = Input::<String>::new()
            .with_prompt(prompt_text(group))
            .allow_empty(true)
            .interact_text();

        Ok(answer.ok())
    }

    fn rejected(&mut self, _response: &str, error: &Error) {
        output::warning(&error.to_string());
    }
}

pub fn run(source: &Path, skip_duplicates: bool, json: bool) -> Result<()> {
    let logger = get_logger();
    log_event(
        &logger,
        LogEvent::new("command_executed")
            .with_command("insert")
            .with_source(source.display().to_string()),
    );

    let ctx = get_context()?;
    let batch = ctx.import_service.read_path(source)?;

    for diagnostic in &batch.diagnostics {
        if !json {
            output::warning(&diagnostic.to_string());
        }
        log_event(&logger, LogEvent::from_diagnostic(diagnostic).with_command("insert"));
    }

    let auto = skip_duplicates || ctx.config.auto_resolve;
    let result = if auto {
        ctx.reconcile_service.run(&batch.records, &mut AutomaticResolver)
    } else {
        let mut resolver = InteractiveResolver::new(TerminalResponses);
        ctx.reconcile_service.run(&batch.records, &mut resolver)
    };

    let report = match result {
        Ok(report) => report,
        Err(Error::Cancelled(reason)) => {
            log_event(
                &logger,
                LogEvent::new("batch_cancelled")
                    .with_command("insert")
                    .with_error(reason.as_str()),
            );
            output::warning("Cancelled. Staged records are kept and resume with the next insert.");
            return Err(Error::Cancelled(reason).into());
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("insert_failed")
                    .with_command("insert")
                    .with_error(e.to_string())
                    .with_error_details(e.kind()),
            );
            return Err(e.into());
        }
    };

    log_event(
        &logger,
        LogEvent::new("batch_committed")
            .with_command("insert")
            .with_source(source.display().to_string())
            .with_error_details(format!(
                "staged={} resumed={} groups={} discarded={} committed={}",
                report.staged, report.resumed, report.groups, report.discarded, report.committed
            )),
    );

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "files": batch.files,
                "diagnostics": batch.diagnostics,
                "reconcile": report,
            }))?
        );
        return Ok(());
    }

    print_summary(&batch, &report);
    Ok(())
}

fn print_summary(batch: &ImportBatch, report: &ReconcileReport) {
    let mut table = output::create_table();
    table.set_header(vec!["File", "Layout", "Records"]);
    for file in &batch.files {
        table.add_row(vec![
            file.source.clone(),
            file.layout.clone().unwrap_or_else(|| "skipped".to_string()),
            file.records.to_string(),
        ]);
    }
    println!("{}", table);
    println!();

    if report.resumed > 0 {
        output::info(&format!("Resumed {} staged records from an earlier run", report.resumed));
    }
    println!("  Staged:     {}", report.staged);
    println!("  Duplicates: {} group(s), {} discarded", report.groups, report.discarded);
    output::success(&format!("Committed {} transaction(s)", report.committed));
}
