//! Reconcile service - stage, group, resolve and commit a batch of records
//!
//! A batch moves through `Empty -> Staged -> Grouped -> Resolved ->
//! Committed -> Empty`. Every step checks the current state and fails with
//! `InvalidState` when called out of order, leaving the batch unchanged.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{group_duplicates, CanonicalRecord, DuplicateGroup, StagedId};
use crate::ports::{CommitSummary, LedgerStore};
use crate::services::resolve::DuplicateResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    Empty,
    Staged,
    Grouped,
    Resolved,
    Committed,
}

/// Outcome of a full reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Records staged by this pass
    pub staged: usize,
    /// Records left in staging by an earlier, unfinished pass
    pub resumed: usize,
    pub groups: usize,
    pub discarded: usize,
    pub committed: usize,
}

/// Reconcile service over a ledger store
pub struct ReconcileService {
    store: Arc<dyn LedgerStore>,
}

impl ReconcileService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Open a batch; non-empty staging means an earlier pass never finished
    /// and the batch starts out `Staged`
    pub fn begin(&self) -> Result<ReconcileBatch<'_>> {
        let leftover = self.store.staged_count()?;
        Ok(ReconcileBatch {
            store: self.store.as_ref(),
            state: if leftover > 0 {
                BatchState::Staged
            } else {
                BatchState::Empty
            },
            leftover,
            staged: 0,
            groups: Vec::new(),
            decisions: Vec::new(),
        })
    }

    /// Run a whole pass: stage, group, ask the resolver per group, commit
    /// and clear. A resolver error (including `Cancelled`) aborts before
    /// anything is deleted or promoted.
    pub fn run(
        &self,
        records: &[CanonicalRecord],
        resolver: &mut dyn DuplicateResolver,
    ) -> Result<ReconcileReport> {
        let mut batch = self.begin()?;
        let resumed = batch.leftover();

        let staged = batch.stage(Some(records))?;
        let groups = batch.group_duplicates()?.to_vec();

        for group in &groups {
            let keep = resolver.keep_count(group)?;
            batch.resolve(group, keep)?;
        }

        let summary = batch.commit_staged()?;
        batch.clear_staging()?;

        Ok(ReconcileReport {
            staged,
            resumed,
            groups: groups.len(),
            discarded: summary.discarded,
            committed: summary.committed,
        })
    }
}

/// One reconciliation pass over the staging area
pub struct ReconcileBatch<'a> {
    store: &'a dyn LedgerStore,
    state: BatchState,
    leftover: usize,
    staged: usize,
    groups: Vec<DuplicateGroup>,
    decisions: Vec<Option<usize>>,
}

impl<'a> ReconcileBatch<'a> {
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Records found in staging when the batch was opened
    pub fn leftover(&self) -> usize {
        self.leftover
    }

    pub fn groups(&self) -> &[DuplicateGroup] {
        &self.groups
    }

    fn expect_state(&self, allowed: &[BatchState], operation: &str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::invalid_state(format!(
                "cannot {} while the batch is {:?}",
                operation, self.state
            )))
        }
    }

    /// Register descriptions and stage records in one storage transaction.
    /// An empty slice is a valid, empty batch.
    pub fn stage(&mut self, records: Option<&[CanonicalRecord]>) -> Result<usize> {
        let records = records.ok_or_else(|| Error::invalid_argument("no records to stage"))?;
        self.expect_state(&[BatchState::Empty, BatchState::Staged], "stage records")?;

        let ids = self.store.stage_records(records)?;
        self.staged += ids.len();
        self.state = BatchState::Staged;
        Ok(ids.len())
    }

    /// Group everything in staging against committed storage
    pub fn group_duplicates(&mut self) -> Result<&[DuplicateGroup]> {
        self.expect_state(&[BatchState::Staged], "group duplicates")?;

        let staged = self.store.staged_records()?;
        let committed = self.store.committed_counts()?;

        self.groups = group_duplicates(&staged, &committed);
        self.decisions = vec![None; self.groups.len()];
        self.state = if self.groups.is_empty() {
            BatchState::Resolved
        } else {
            BatchState::Grouped
        };

        Ok(&self.groups)
    }

    /// Keep `keep` new copies of `group`; the oldest staged copies beyond
    /// that are discarded at commit. A group may be re-decided until then.
    pub fn resolve(&mut self, group: &DuplicateGroup, keep: usize) -> Result<()> {
        self.expect_state(&[BatchState::Grouped, BatchState::Resolved], "resolve a group")?;

        let index = self
            .groups
            .iter()
            .position(|g| g.key == group.key)
            .ok_or_else(|| {
                Error::invalid_argument(format!("{} is not a group of this batch", group.key))
            })?;

        let entry_count = self.groups[index].entry_count();
        if keep > entry_count {
            return Err(Error::invalid_argument(format!(
                "cannot keep {} of {} new copies",
                keep, entry_count
            )));
        }

        self.decisions[index] = Some(keep);
        if self.decisions.iter().all(Option::is_some) {
            self.state = BatchState::Resolved;
        }
        Ok(())
    }

    /// Staged identifiers the current decisions discard
    pub fn pending_discards(&self) -> Vec<StagedId> {
        self.groups
            .iter()
            .zip(&self.decisions)
            .filter_map(|(group, keep)| keep.map(|k| group.discards_for(k)))
            .flatten()
            .copied()
            .collect()
    }

    /// Delete discarded copies, promote the survivors and empty staging,
    /// atomically
    pub fn commit_staged(&mut self) -> Result<CommitSummary> {
        if self.state == BatchState::Grouped {
            let open = self.decisions.iter().filter(|d| d.is_none()).count();
            return Err(Error::invalid_state(format!(
                "{} duplicate group(s) still unresolved",
                open
            )));
        }
        self.expect_state(&[BatchState::Resolved], "commit")?;

        let summary = self.store.commit_staged(&self.pending_discards())?;
        self.state = BatchState::Committed;
        Ok(summary)
    }

    /// Unconditionally empty staging after a commit
    pub fn clear_staging(&mut self) -> Result<usize> {
        self.expect_state(&[BatchState::Committed], "clear staging")?;

        let cleared = self.store.clear_staging()?;
        self.state = BatchState::Empty;
        self.staged = 0;
        self.leftover = 0;
        self.groups.clear();
        self.decisions.clear();
        Ok(cleared)
    }
}
