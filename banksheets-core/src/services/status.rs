//! Status service - ledger summary

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::ports::LedgerStore;

pub struct StatusService {
    repository: Arc<DuckDbRepository>,
}

impl StatusService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Get overall status summary
    pub fn get_status(&self) -> Result<StatusSummary> {
        let date_range = match self.repository.committed_date_range()? {
            Some((earliest, latest)) => DateRange {
                earliest: Some(earliest.to_string()),
                latest: Some(latest.to_string()),
            },
            None => DateRange {
                earliest: None,
                latest: None,
            },
        };

        Ok(StatusSummary {
            total_descriptions: self.repository.count_descriptions()?,
            total_committed: self.repository.count_committed()?,
            total_staged: self.repository.staged_count()?,
            date_range,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct StatusSummary {
    pub total_descriptions: usize,
    pub total_committed: usize,
    /// Non-zero only when a reconciliation pass was interrupted
    pub total_staged: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_status() {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let status = StatusService::new(Arc::new(repo)).get_status().unwrap();

        assert_eq!(status.total_committed, 0);
        assert_eq!(status.total_staged, 0);
        assert!(status.date_range.earliest.is_none());
    }
}
