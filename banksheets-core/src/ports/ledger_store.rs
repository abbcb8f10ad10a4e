//! Ledger store port - staging area and committed storage

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{CanonicalRecord, DuplicateKey, StagedId, StagedRecord};

/// Row counts touched by an atomic commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    pub discarded: usize,
    pub committed: usize,
}

/// Storage operations behind the reconciliation workflow
///
/// Every multi-statement operation runs in one storage transaction and
/// leaves no partial state behind on error.
pub trait LedgerStore: Send + Sync {
    /// Register descriptions (insert-ignore) and insert records into staging.
    /// Returns staging identifiers in input order.
    fn stage_records(&self, records: &[CanonicalRecord]) -> Result<Vec<StagedId>>;

    /// All staged records in insertion order
    fn staged_records(&self) -> Result<Vec<StagedRecord>>;

    fn staged_count(&self) -> Result<usize>;

    /// Committed record counts for the keys currently in staging.
    /// Keys with no committed match are absent.
    fn committed_counts(&self) -> Result<HashMap<DuplicateKey, usize>>;

    /// Delete staged rows by identifier
    fn remove_staged(&self, ids: &[StagedId]) -> Result<usize>;

    /// Copy every staged row into committed storage
    fn promote_staged(&self) -> Result<usize>;

    /// Delete every staged row
    fn clear_staging(&self) -> Result<usize>;

    /// Delete `discard`, promote the rest, clear staging: all or nothing
    fn commit_staged(&self, discard: &[StagedId]) -> Result<CommitSummary>;
}
