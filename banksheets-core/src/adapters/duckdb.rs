//! DuckDB repository implementation

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use chrono::NaiveDate;
use duckdb::{params, params_from_iter, Connection};
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{
    CanonicalRecord, CommittedRecord, Description, DescriptionPattern, DuplicateKey, ReportFilter,
    StagedId, StagedRecord,
};
use crate::ports::{CommitSummary, LedgerStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::database(format!("bad stored date '{}': {}", raw, e)))
}

fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map(|d| d.normalize())
        .map_err(|e| Error::database(format!("bad stored amount '{}': {}", raw, e)))
}

fn split_aliases(raw: Option<String>) -> Vec<String> {
    raw.map(|s| s.split('\u{1f}').map(str::to_string).collect())
        .unwrap_or_default()
}

/// Aliases of the outer `description d`, unit-separator joined
const ALIAS_LIST: &str = "(SELECT string_agg(a.alias, chr(31) ORDER BY a.alias)
      FROM description_alias a WHERE a.description_id = d.description_id)";

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff on file locking errors, which show
    /// up when another process still holds the file.
    pub fn new(db_path: &Path) -> anyhow::Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[banksheets] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to open database after {} retries", MAX_RETRIES)))
    }

    /// Transient in-memory database
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self {
            conn: Mutex::new(Connection::open_in_memory()?),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> anyhow::Result<Connection> {
        // Extension autoloading stays off; nothing here needs an extension
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> anyhow::Result<MigrationResult> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    // === Descriptions ===

    /// All registered descriptions with their aliases, by name
    pub fn get_descriptions(&self) -> Result<Vec<Description>> {
        self.query_descriptions("", &[])
    }

    /// Descriptions whose name matches the pattern
    pub fn find_descriptions(&self, pattern: &DescriptionPattern) -> Result<Vec<Description>> {
        let clause = format!("WHERE {}", pattern.condition("d.name"));
        self.query_descriptions(&clause, &[pattern.as_str().to_string()])
    }

    /// Descriptions that have no alias yet
    pub fn descriptions_without_alias(&self) -> Result<Vec<Description>> {
        self.query_descriptions(
            "WHERE NOT EXISTS (SELECT 1 FROM description_alias a WHERE a.description_id = d.description_id)",
            &[],
        )
    }

    fn query_descriptions(&self, clause: &str, values: &[String]) -> Result<Vec<Description>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT d.description_id, d.name, {} AS aliases FROM description d {} ORDER BY d.name",
            ALIAS_LIST, clause
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .map(|(id, name, aliases)| Description {
                id,
                name,
                aliases: split_aliases(aliases),
            })
            .collect())
    }

    /// Add `alias` to each description that does not already carry it.
    /// Returns the number of aliases created.
    pub fn add_alias(&self, description_ids: &[i64], alias: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut created = 0;
        {
            let mut insert = tx.prepare(
                "INSERT INTO description_alias (description_id, alias)
                 SELECT CAST(? AS BIGINT), CAST(? AS VARCHAR) WHERE NOT EXISTS (
                     SELECT 1 FROM description_alias WHERE description_id = ? AND alias = ?)",
            )?;
            for id in description_ids {
                created += insert.execute(params![id, alias, id, alias])?;
            }
        }
        tx.commit()?;
        Ok(created)
    }

    /// Replace every alias of each description with `alias`
    pub fn replace_alias(&self, description_ids: &[i64], alias: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut delete = tx.prepare("DELETE FROM description_alias WHERE description_id = ?")?;
            let mut insert =
                tx.prepare("INSERT INTO description_alias (description_id, alias) VALUES (?, ?)")?;
            for id in description_ids {
                delete.execute([id])?;
                insert.execute(params![id, alias])?;
            }
        }
        tx.commit()?;
        Ok(description_ids.len())
    }

    // === Committed records ===

    /// Committed records matching the filter, by date then insertion
    pub fn query_committed(&self, filter: &ReportFilter) -> Result<Vec<CommittedRecord>> {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(start) = filter.start {
            clauses.push("t.date >= CAST(? AS DATE)".to_string());
            values.push(start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = filter.end {
            clauses.push("t.date <= CAST(? AS DATE)".to_string());
            values.push(end.format("%Y-%m-%d").to_string());
        }
        if let Some(pattern) = &filter.description {
            clauses.push(format!(
                "({} OR EXISTS (SELECT 1 FROM description_alias a
                   WHERE a.description_id = d.description_id AND {}))",
                pattern.condition("d.name"),
                pattern.condition("a.alias")
            ));
            values.push(pattern.as_str().to_string());
            values.push(pattern.as_str().to_string());
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let sql = format!(
            "SELECT t.id, t.date::VARCHAR, t.amount::VARCHAR, d.name, t.extra_description, {} AS aliases
             FROM bank_transaction t
             JOIN description d ON d.description_id = t.description_id
             {}
             ORDER BY t.date, t.id",
            ALIAS_LIST, where_clause
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, date, amount, name, extra, aliases)| {
                Ok(CommittedRecord {
                    id,
                    record: CanonicalRecord::new(
                        parse_date(&date)?,
                        parse_decimal(&amount)?,
                        name,
                        extra,
                    )?,
                    aliases: split_aliases(aliases),
                })
            })
            .collect()
    }

    pub fn count_descriptions(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM description")
    }

    pub fn count_committed(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM bank_transaction")
    }

    /// Earliest and latest committed dates, if anything is committed
    pub fn committed_date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let conn = self.conn()?;
        let (min, max): (Option<String>, Option<String>) = conn.query_row(
            "SELECT MIN(date)::VARCHAR, MAX(date)::VARCHAR FROM bank_transaction",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        match (min, max) {
            (Some(min), Some(max)) => Ok(Some((parse_date(&min)?, parse_date(&max)?))),
            _ => Ok(None),
        }
    }

    fn count(&self, sql: &str) -> Result<usize> {
        let conn = self.conn()?;
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

// Statement helpers shared by single operations and the atomic commit.
// A `Transaction` derefs to `Connection`, so both paths call these.

fn delete_staged(conn: &Connection, ids: &[StagedId]) -> Result<usize> {
    let mut stmt = conn.prepare("DELETE FROM potential_transaction WHERE id = ?")?;
    let mut removed = 0;
    for id in ids {
        removed += stmt.execute([id])?;
    }
    Ok(removed)
}

fn promote(conn: &Connection) -> Result<usize> {
    let promoted = conn.execute(
        "INSERT INTO bank_transaction (date, amount, description_id, extra_description)
         SELECT date, amount, description_id, extra_description
         FROM potential_transaction ORDER BY id",
        [],
    )?;
    Ok(promoted)
}

fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM potential_transaction", [])?)
}

impl LedgerStore for DuckDbRepository {
    fn stage_records(&self, records: &[CanonicalRecord]) -> Result<Vec<StagedId>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut insert_description =
                tx.prepare("INSERT INTO description (name) VALUES (?) ON CONFLICT DO NOTHING")?;
            let mut find_description =
                tx.prepare("SELECT description_id FROM description WHERE name = ?")?;
            let mut next_id = tx.prepare("SELECT nextval('seq_potential_transaction')")?;
            let mut insert = tx.prepare(
                "INSERT INTO potential_transaction (id, date, amount, description_id, extra_description)
                 VALUES (?, CAST(? AS DATE), CAST(? AS DECIMAL(18, 4)), ?, ?)",
            )?;

            for record in records {
                insert_description.execute([record.description()])?;
                let description_id: i64 =
                    find_description.query_row([record.description()], |row| row.get(0))?;
                let id: i64 = next_id.query_row([], |row| row.get(0))?;

                insert.execute(params![
                    id,
                    record.date().format("%Y-%m-%d").to_string(),
                    record.amount().to_string(),
                    description_id,
                    record.extra_description(),
                ])?;
                ids.push(id);
            }
        }
        tx.commit()?;

        Ok(ids)
    }

    fn staged_records(&self) -> Result<Vec<StagedRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.description_id, p.date::VARCHAR, p.amount::VARCHAR, d.name, p.extra_description
             FROM potential_transaction p
             JOIN description d ON d.description_id = p.description_id
             ORDER BY p.id",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, description_id, date, amount, name, extra)| {
                Ok(StagedRecord {
                    id,
                    description_id,
                    record: CanonicalRecord::new(
                        parse_date(&date)?,
                        parse_decimal(&amount)?,
                        name,
                        extra,
                    )?,
                })
            })
            .collect()
    }

    fn staged_count(&self) -> Result<usize> {
        self.count("SELECT COUNT(*) FROM potential_transaction")
    }

    fn committed_counts(&self) -> Result<HashMap<DuplicateKey, usize>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.date::VARCHAR, s.amount::VARCHAR, d.name, COUNT(*)
             FROM (SELECT DISTINCT date, amount, description_id FROM potential_transaction) s
             JOIN description d ON d.description_id = s.description_id
             JOIN bank_transaction b
               ON b.date = s.date AND b.amount = s.amount AND b.description_id = s.description_id
             GROUP BY s.date, s.amount, d.name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut counts = HashMap::with_capacity(rows.len());
        for (date, amount, name, count) in rows {
            let key = DuplicateKey::new(parse_date(&date)?, parse_decimal(&amount)?, name);
            counts.insert(key, count as usize);
        }
        Ok(counts)
    }

    fn remove_staged(&self, ids: &[StagedId]) -> Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let removed = delete_staged(&tx, ids)?;
        tx.commit()?;
        Ok(removed)
    }

    fn promote_staged(&self) -> Result<usize> {
        let conn = self.conn()?;
        promote(&conn)
    }

    fn clear_staging(&self) -> Result<usize> {
        let conn = self.conn()?;
        clear(&conn)
    }

    fn commit_staged(&self, discard: &[StagedId]) -> Result<CommitSummary> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let discarded = delete_staged(&tx, discard)?;
        let committed = promote(&tx)?;
        clear(&tx)?;

        tx.commit()?;
        Ok(CommitSummary {
            discarded,
            committed,
        })
    }
}
