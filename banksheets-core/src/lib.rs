//! Banksheets Core - bank statement ingestion and duplicate reconciliation
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: canonical records, duplicate keys and groups, errors
//! - **ingest**: header location, layout mapping and record building for CSV exports
//! - **ports**: the `LedgerStore` trait the reconciliation workflow runs against
//! - **services**: import, reconciliation, aliases, reports, status, event log
//! - **adapters**: DuckDB implementation of the store

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ingest;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use adapters::duckdb::DuckDbRepository;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::Error;
pub use domain::{
    CanonicalField, CanonicalRecord, CommittedRecord, Description, DescriptionPattern,
    DuplicateGroup, DuplicateKey, ReportFilter, StagedRecord,
};
pub use ingest::{Diagnostic, Layout, LayoutRegistry, SourceParser};
pub use ports::{CommitSummary, LedgerStore};

/// Ledger database file inside the data directory
pub const DB_FILENAME: &str = "banksheets.duckdb";

/// Main context for Banksheets operations
///
/// Holds the configuration, the ledger database and every service wired
/// against it.
pub struct BanksheetsContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub reconcile_service: ReconcileService,
    pub alias_service: AliasService,
    pub report_service: ReportService,
    pub status_service: StatusService,
}

impl BanksheetsContext {
    /// Open the ledger in `data_dir`, creating and migrating it as needed
    pub fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;

        let repository = Arc::new(DuckDbRepository::new(&data_dir.join(DB_FILENAME))?);
        repository.ensure_schema()?;

        let import_service = ImportService::new(config.source_parser()?);
        let reconcile_service = ReconcileService::new(repository.clone());
        let alias_service = AliasService::new(Arc::clone(&repository));
        let report_service = ReportService::new(Arc::clone(&repository));
        let status_service = StatusService::new(Arc::clone(&repository));

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            repository,
            import_service,
            reconcile_service,
            alias_service,
            report_service,
            status_service,
        })
    }
}
