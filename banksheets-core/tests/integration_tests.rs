//! Integration tests for banksheets-core
//!
//! End-to-end import and reconciliation runs against real DuckDB files.
//!
//! Run with: cargo test --test integration_tests -- --nocapture

use std::str::FromStr;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use banksheets_core::adapters::duckdb::DuckDbRepository;
use banksheets_core::domain::CanonicalField;
use banksheets_core::ingest::{RecordBuilder, SourceParser, DEFAULT_DATE_FORMAT};
use banksheets_core::services::{
    AutomaticResolver, ImportService, InteractiveResolver, ReconcileService, ScriptedResponses,
};
use banksheets_core::{BanksheetsContext, CanonicalRecord, Error, LedgerStore, ReportFilter};

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a test repository with schema initialized
fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
    let db_path = temp_dir.path().join("test.duckdb");
    let repo = DuckDbRepository::new(&db_path).expect("Failed to create repository");
    repo.ensure_schema().expect("Failed to initialize schema");
    Arc::new(repo)
}

fn record(date: (i32, u32, u32), amount: &str, desc: &str, extra: &str) -> CanonicalRecord {
    CanonicalRecord::new(
        NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        Decimal::from_str(amount).unwrap(),
        desc,
        extra,
    )
    .unwrap()
}

fn committed_extras(repo: &DuckDbRepository) -> Vec<String> {
    let mut extras: Vec<String> = repo
        .query_committed(&ReportFilter::default())
        .unwrap()
        .into_iter()
        .map(|c| c.record.extra_description().to_string())
        .collect();
    extras.sort();
    extras
}

const CREDIT_CARD_EXPORT: &str = "\
Posted Date,Reference Number,Payee,Address,Amount
02/11/2021,24492151042720052118021,Popeyes,\"Frankfurt IL \",-10.02
02/11/2021,24492151042720052118022,Popeyes,\"Frankfurt IL \",-10.02
02/12/2021,24692161043100154879931,SHELL OIL 57444,\"MOKENA IL\",-31.40
02/15/2021,74692161045100154879931,PAYMENT - THANK YOU,\"\",250.00
";

// ============================================================================
// Reconciliation Scenarios
// ============================================================================

/// A single new record with nothing committed is not a duplicate
#[test]
fn test_scenario_single_new_record_commits() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());

    let mut batch = service.begin().unwrap();
    batch
        .stage(Some(&[record((2021, 2, 11), "-10.02", "Popeyes", "")]))
        .unwrap();
    assert!(batch.group_duplicates().unwrap().is_empty());

    let summary = batch.commit_staged().unwrap();
    batch.clear_staging().unwrap();

    assert_eq!(summary.committed, 1);
    assert_eq!(repo.count_committed().unwrap(), 1);
    assert_eq!(repo.staged_count().unwrap(), 0);
}

/// Staging a committed record again groups it against committed storage
#[test]
fn test_scenario_restaged_record_matches_committed() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());
    let company = record((2023, 1, 1), "100.25", "Company A", "");

    service
        .run(std::slice::from_ref(&company), &mut AutomaticResolver)
        .unwrap();

    let mut batch = service.begin().unwrap();
    batch.stage(Some(&[company])).unwrap();
    let groups = batch.group_duplicates().unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].entry_count(), 1);
    assert_eq!(groups[0].committed_count, 1);
}

/// Interactive answers: out-of-range and non-numeric responses are
/// re-prompted; keeping 2 of 3 keeps the two most recently staged
#[test]
fn test_scenario_interactive_keep_two_of_three() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());

    let records = vec![
        record((2021, 1, 4), "-13.59", "RALLY", "first"),
        record((2021, 1, 4), "-13.59", "RALLY", "second"),
        record((2021, 1, 4), "-13.59", "RALLY", "third"),
    ];

    let mut resolver = InteractiveResolver::new(ScriptedResponses::new(["5", "abc", "2"]));
    let report = service.run(&records, &mut resolver).unwrap();

    assert_eq!(report.groups, 1);
    assert_eq!(report.discarded, 1);
    assert_eq!(report.committed, 2);
    assert_eq!(committed_extras(&repo), vec!["second", "third"]);

    let source = resolver.into_inner();
    assert_eq!(source.prompts.len(), 3);
    assert_eq!(source.prompts[0], "Input number of new copies to keep (max: 3)");
    assert_eq!(source.rejections.len(), 2);
    assert!(source.rejections[0].1.starts_with("Invalid response"));
}

/// Header preceded by ten summary lines resolves to line eleven
#[test]
fn test_scenario_header_after_summary_lines() {
    let mut text = String::new();
    for i in 0..10 {
        text.push_str(&format!("Summary line {},,\n", i + 1));
    }
    text.push_str("Date,Description,Amount,Running Bal.\n");
    text.push_str("01/04/2021,RALLY,-13.59,986.41\n");
    text.push_str("01/05/2021,COFFEE,-2.00,984.41\n");

    let parsed = SourceParser::default().parse("checking.csv", &text).unwrap();
    assert_eq!(parsed.header_line, 11);
    assert_eq!(parsed.layout, "checking");
    assert_eq!(parsed.records.len(), 2);
}

// ============================================================================
// Properties
// ============================================================================

/// Importing the same export twice with the automatic policy changes nothing
/// the second time
#[test]
fn test_repeat_import_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());
    let import = ImportService::new(SourceParser::default());

    let batch = import.read_str("cc.csv", CREDIT_CARD_EXPORT);
    assert_eq!(batch.records.len(), 4);

    let first = service.run(&batch.records, &mut AutomaticResolver).unwrap();
    assert_eq!(first.groups, 1);
    assert_eq!(first.committed, 3);

    let after_first = repo.query_committed(&ReportFilter::default()).unwrap();

    let second = service.run(&batch.records, &mut AutomaticResolver).unwrap();
    assert_eq!(second.committed, 0);
    assert_eq!(second.discarded, 4);

    let after_second = repo.query_committed(&ReportFilter::default()).unwrap();
    assert_eq!(after_first, after_second);
    assert_eq!(repo.staged_count().unwrap(), 0);
}

/// Records formatted back into raw fields rebuild to equal records
#[test]
fn test_record_round_trip() {
    let builder = RecordBuilder::default();
    let records = vec![
        record((2021, 2, 11), "-10.02", "Popeyes", "24492151042720052118021"),
        record((2020, 12, 31), "1500", "Payroll", ""),
        record((2021, 1, 4), "-0.5", "Fee", ""),
    ];

    for original in records {
        let raw = original.to_raw_row(DEFAULT_DATE_FORMAT);
        assert_eq!(raw[&CanonicalField::Date].len(), 10);
        assert_eq!(builder.build(&raw).unwrap(), original);
    }
}

#[test]
fn test_file_level_failures_are_reported() {
    let import = ImportService::new(SourceParser::default());

    let no_header = import.read_str("rows.csv", "01/04/2021,RALLY,-13.59\n01/05/2021,X,1\n");
    assert_eq!(no_header.diagnostics[0].kind, "no_header_found");

    let summary_only = import.read_str("summary.csv", "Account,Checking\nBalance,100.00\n");
    assert_eq!(summary_only.diagnostics[0].kind, "no_header_found");

    let unknown = import.read_str("other.csv", "P Date,Amount\n01/04/2021,1.00\n");
    assert_eq!(unknown.diagnostics[0].kind, "unknown_layout");
}

/// Amounts the ledger cannot hold are skipped rows, not a failed batch
#[test]
fn test_unstorable_amount_skips_only_its_row() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());
    let import = ImportService::new(SourceParser::default());

    let batch = import.read_str(
        "checking.csv",
        "Date,Description,Amount,Running Bal.\n\
         01/04/2021,RALLY,-13.59,1\n\
         01/05/2021,FX FEE,-0.12345,1\n\
         01/06/2021,WIRE,123456789012345678,1\n",
    );

    assert_eq!(batch.records.len(), 1);
    assert_eq!(batch.diagnostics.len(), 2);
    assert!(batch.diagnostics.iter().all(|d| d.kind == "malformed_record"));
    assert_eq!(batch.diagnostics[0].line, Some(3));
    assert_eq!(batch.diagnostics[1].line, Some(4));

    let report = service.run(&batch.records, &mut AutomaticResolver).unwrap();
    assert_eq!(report.committed, 1);
    assert_eq!(repo.count_committed().unwrap(), 1);
}

/// A cancelled pass leaves staging untouched and commits nothing
#[test]
fn test_cancelled_pass_leaves_storage_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let repo = create_test_repo(&temp_dir);
    let service = ReconcileService::new(repo.clone());
    let rally = record((2021, 1, 4), "-13.59", "RALLY", "");

    let mut resolver = InteractiveResolver::new(ScriptedResponses::new(Vec::<String>::new()));
    let result = service.run(&[rally.clone(), rally], &mut resolver);

    assert!(matches!(result, Err(Error::Cancelled(_))));
    assert_eq!(repo.staged_count().unwrap(), 2);
    assert_eq!(repo.count_committed().unwrap(), 0);
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_context_persists_between_opens() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("cc.csv");
    std::fs::write(&source, CREDIT_CARD_EXPORT).unwrap();
    let data_dir = temp_dir.path().join("data");

    {
        let ctx = BanksheetsContext::new(&data_dir).unwrap();
        let batch = ctx.import_service.read_path(&source).unwrap();
        ctx.reconcile_service
            .run(&batch.records, &mut AutomaticResolver)
            .unwrap();
    }

    let ctx = BanksheetsContext::new(&data_dir).unwrap();
    let status = ctx.status_service.get_status().unwrap();
    assert_eq!(status.total_committed, 3);
    assert_eq!(status.total_descriptions, 3);
    assert_eq!(status.date_range.earliest.as_deref(), Some("2021-02-11"));
}
