//! Report service - committed records out as CSV

use std::io::Write;
use std::sync::Arc;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Result;
use crate::domain::{CommittedRecord, ReportFilter};

const REPORT_DATE_FORMAT: &str = "%m/%d/%Y";
const REPORT_HEADER: [&str; 5] = ["date", "amount", "description", "alias", "extra_description"];

pub struct ReportService {
    repository: Arc<DuckDbRepository>,
}

impl ReportService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn query(&self, filter: &ReportFilter) -> Result<Vec<CommittedRecord>> {
        self.repository.query_committed(filter)
    }

    /// Write matching records as CSV with a header row; returns the row count
    pub fn write_csv<W: Write>(&self, filter: &ReportFilter, writer: W) -> Result<usize> {
        let records = self.query(filter)?;
        write_records(&records, writer)?;
        Ok(records.len())
    }
}

/// Serialize committed records as CSV
pub fn write_records<W: Write>(records: &[CommittedRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(REPORT_HEADER)?;

    for committed in records {
        let record = &committed.record;
        csv_writer.write_record([
            record.date().format(REPORT_DATE_FORMAT).to_string().as_str(),
            record.amount().to_string().as_str(),
            record.description(),
            committed.aliases.join(";").as_str(),
            record.extra_description(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
