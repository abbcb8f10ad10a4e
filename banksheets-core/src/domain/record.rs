//! Canonical transaction record

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::duplicate::DuplicateKey;
use super::result::{Error, Result};

/// Most decimal places an amount may carry; storage is `DECIMAL(18, 4)`
pub const MAX_AMOUNT_SCALE: u32 = 4;

/// Exclusive bound on an amount's magnitude, 10^14
fn amount_limit() -> Decimal {
    Decimal::new(100_000_000_000_000, 0)
}

/// Fields every source layout is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Date,
    Amount,
    Description,
    ExtraDescription,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Amount => "amount",
            CanonicalField::Description => "description",
            CanonicalField::ExtraDescription => "extra_description",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source row after column mapping: canonical field -> raw text
pub type MappedRow = BTreeMap<CanonicalField, String>;

/// A normalized bank transaction
///
/// Records order by date first; amount, description and extra description
/// break ties so the ordering is total. The amount is kept normalized so
/// `-10.02` and `-10.020` are the same value everywhere, including hashing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CanonicalRecord {
    date: NaiveDate,
    amount: Decimal,
    description: String,
    extra_description: String,
}

impl CanonicalRecord {
    /// Create a record, rejecting an empty description and amounts that
    /// need more than four decimal places or fourteen integer digits
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        extra_description: impl Into<String>,
    ) -> Result<Self> {
        let description = description.into().trim().to_string();
        if description.is_empty() {
            return Err(Error::malformed("description is empty"));
        }

        let amount = amount.normalize();
        if amount.scale() > MAX_AMOUNT_SCALE {
            return Err(Error::malformed(format!(
                "amount {} has more than {} decimal places",
                amount, MAX_AMOUNT_SCALE
            )));
        }
        if amount.abs() >= amount_limit() {
            return Err(Error::malformed(format!("amount {} is out of range", amount)));
        }

        Ok(Self {
            date,
            amount,
            description,
            extra_description: extra_description.into().trim().to_string(),
        })
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

    pub fn extra_description(&self) -> &str {
        &self.extra_description
    }

    /// Identity used for duplicate detection (extra description excluded)
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey::new(self.date, self.amount, self.description.clone())
    }

    /// Format the record back into raw source fields
    pub fn to_raw_row(&self, date_format: &str) -> MappedRow {
        let mut row = MappedRow::new();
        row.insert(CanonicalField::Date, self.date.format(date_format).to_string());
        row.insert(CanonicalField::Amount, self.amount.to_string());
        row.insert(CanonicalField::Description, self.description.clone());
        if !self.extra_description.is_empty() {
            row.insert(CanonicalField::ExtraDescription, self.extra_description.clone());
        }
        row
    }
}

impl fmt::Display for CanonicalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.date.format("%m/%d/%Y"),
            self.amount,
            self.description,
            self.extra_description
        )
    }
}

/// Auto-assigned staging row identifier; ascending order is insertion order
pub type StagedId = i64;

/// A record held in the staging area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedRecord {
    pub id: StagedId,
    pub description_id: i64,
    pub record: CanonicalRecord,
}
