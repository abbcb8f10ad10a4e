//! Duplicate identity and grouping

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::record::{StagedId, StagedRecord};

/// Logical identity of a transaction: (date, amount, description).
/// The amount is normalized so equal values hash alike.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DuplicateKey {
    date: NaiveDate,
    amount: Decimal,
    description: String,
}

impl DuplicateKey {
    pub fn new(date: NaiveDate, amount: Decimal, description: impl Into<String>) -> Self {
        Self {
            date,
            amount: amount.normalize(),
            description: description.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Display for DuplicateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.date.format("%m/%d/%Y"),
            self.amount,
            self.description
        )
    }
}

/// Staged records sharing one key, plus how many committed records match it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    /// Staging identifiers in insertion order (oldest first)
    pub staged_ids: Vec<StagedId>,
    pub committed_count: usize,
}

impl DuplicateGroup {
    /// Number of new candidate copies in staging
    pub fn entry_count(&self) -> usize {
        self.staged_ids.len()
    }

    /// Staged identifiers to discard when keeping `keep` new copies.
    ///
    /// The oldest insertions go first; callers validate `keep <= entry_count`.
    pub fn discards_for(&self, keep: usize) -> &[StagedId] {
        let discard = self.entry_count().saturating_sub(keep);
        &self.staged_ids[..discard]
    }
}

/// Group staged records by identity.
///
/// A group is emitted when its key occurs more than once in staging or at
/// least once in committed storage. `committed_counts` only needs entries for
/// keys that have committed matches. Output is ordered by date, then amount,
/// then description.
pub fn group_duplicates(
    staged: &[StagedRecord],
    committed_counts: &HashMap<DuplicateKey, usize>,
) -> Vec<DuplicateGroup> {
    let mut by_key: HashMap<DuplicateKey, Vec<StagedId>> = HashMap::new();
    for staged_record in staged {
        by_key
            .entry(staged_record.record.duplicate_key())
            .or_default()
            .push(staged_record.id);
    }

    let mut groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter_map(|(key, mut staged_ids)| {
            let committed_count = committed_counts.get(&key).copied().unwrap_or(0);
            if staged_ids.len() > 1 || committed_count > 0 {
                staged_ids.sort_unstable();
                Some(DuplicateGroup {
                    key,
                    staged_ids,
                    committed_count,
                })
            } else {
                None
            }
        })
        .collect();

    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}
