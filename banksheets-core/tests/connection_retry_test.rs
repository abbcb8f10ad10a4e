//! Reopening the ledger file
//!
//! Run with: cargo test --test connection_retry_test -- --nocapture

use std::str::FromStr;
use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tempfile::TempDir;

use banksheets_core::adapters::duckdb::DuckDbRepository;
use banksheets_core::{CanonicalRecord, LedgerStore};

/// Open and close the same file repeatedly; migrations stay idempotent and
/// staged rows survive each reopen
#[test]
fn test_sequential_connections() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test_sequential.duckdb");

    let rally = CanonicalRecord::new(
        NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
        Decimal::from_str("-13.59").unwrap(),
        "RALLY",
        "",
    )
    .unwrap();

    for i in 0..5 {
        let start = Instant::now();
        let repo = DuckDbRepository::new(&db_path).unwrap();
        repo.ensure_schema().unwrap();
        println!("Connection {}: opened in {:?}", i, start.elapsed());

        assert_eq!(repo.staged_count().unwrap(), i);
        repo.stage_records(std::slice::from_ref(&rally)).unwrap();
    }

    let repo = DuckDbRepository::new(&db_path).unwrap();
    assert_eq!(repo.staged_count().unwrap(), 5);
    assert_eq!(repo.get_descriptions().unwrap().len(), 1);
}

#[test]
fn test_missing_parent_directory_fails_without_retry() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("missing").join("ledger.duckdb");

    let start = Instant::now();
    assert!(DuckDbRepository::new(&db_path).is_err());
    // Non-retryable errors return before the first backoff sleep
    assert!(start.elapsed().as_millis() < 5_000);
}
