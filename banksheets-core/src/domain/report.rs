//! Committed record views and report filtering

use chrono::NaiveDate;
use serde::Serialize;

use super::record::CanonicalRecord;

/// Match a description name or alias, ignoring case: SQL `ILIKE` when the
/// pattern holds a wildcard (`%` or `_`), whole-text equality otherwise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionPattern(String);

impl DescriptionPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0.contains('%') || self.0.contains('_')
    }

    /// SQL condition testing `column` against one bound parameter
    pub fn condition(&self, column: &str) -> String {
        if self.is_wildcard() {
            format!("{} ILIKE ?", column)
        } else {
            format!("lower({}) = lower(?)", column)
        }
    }
}

/// Filter for committed-record reports; every bound is optional and inclusive
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub description: Option<DescriptionPattern>,
}

/// A record in permanent storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedRecord {
    pub id: i64,
    pub record: CanonicalRecord,
    /// Aliases of the record's description, alphabetical
    pub aliases: Vec<String>,
}
