//! Record builder - turns mapped raw rows into canonical records

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalField, CanonicalRecord, MappedRow};

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Builds canonical records using one fixed date format
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    date_format: String,
}

impl RecordBuilder {
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Build one record; any bad or missing field is `MalformedRecord`
    pub fn build(&self, row: &MappedRow) -> Result<CanonicalRecord> {
        let raw_date = required(row, CanonicalField::Date)?;
        let date = NaiveDate::parse_from_str(raw_date, &self.date_format).map_err(|_| {
            Error::malformed(format!(
                "date '{}' does not match {}",
                raw_date, self.date_format
            ))
        })?;

        let amount = parse_amount(required(row, CanonicalField::Amount)?)?;
        let description = required(row, CanonicalField::Description)?;
        let extra = row
            .get(&CanonicalField::ExtraDescription)
            .map(|s| s.trim())
            .unwrap_or_default();

        CanonicalRecord::new(date, amount, description, extra)
    }
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

fn required(row: &MappedRow, field: CanonicalField) -> Result<&str> {
    match row.get(&field).map(|s| s.trim().trim_matches('"').trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::malformed(format!("missing {}", field))),
    }
}

/// Parse an amount as printed by a bank export
///
/// Handles currency symbols, thousands separators, decimal commas,
/// accounting parentheses and leading or trailing minus signs.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let bad = || Error::malformed(format!("amount '{}' is not a number", raw.trim()));

    let mut s: &str = raw.trim();
    let mut negative = false;

    if s.starts_with('(') && s.ends_with(')') && s.len() >= 2 {
        negative = true;
        s = &s[1..s.len() - 1];
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '¥' | '\''))
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();

    let mut body = cleaned.as_str();
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    } else if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = rest;
    }

    if body.is_empty()
        || !body.chars().any(|c| c.is_ascii_digit())
        || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return Err(bad());
    }

    let normalized = normalize_separators(body);
    let value = Decimal::from_str(&normalized).map_err(|_| bad())?;

    Ok(if negative { -value } else { value })
}

/// Reduce a digits/dots/commas string to plain `1234.56` form
fn normalize_separators(body: &str) -> String {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');

    match (last_dot, last_comma) {
        (Some(dot), Some(comma)) if comma > dot => body.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => body.replace(',', ""),
        (None, Some(comma)) => {
            let decimals = body.len() - comma - 1;
            if body.matches(',').count() == 1 && (1..=2).contains(&decimals) {
                body.replace(',', ".")
            } else {
                body.replace(',', "")
            }
        }
        (Some(_), None) if body.matches('.').count() > 1 => body.replace('.', ""),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(CanonicalField, &str)]) -> MappedRow {
        pairs.iter().map(|(f, v)| (*f, v.to_string())).collect()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_build_credit_card_row() {
        let builder = RecordBuilder::default();
        let record = builder
            .build(&row(&[
                (CanonicalField::Date, "02/11/2021"),
                (CanonicalField::ExtraDescription, "491091136970529302963377"),
                (CanonicalField::Description, "Popeyes"),
                (CanonicalField::Amount, "-10.02"),
            ]))
            .unwrap();

        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2021, 2, 11).unwrap());
        assert_eq!(record.amount(), dec("-10.02"));
        assert_eq!(record.description(), "Popeyes");
        assert_eq!(record.extra_description(), "491091136970529302963377");
    }

    #[test]
    fn test_extra_description_defaults_to_empty() {
        let builder = RecordBuilder::default();
        let record = builder
            .build(&row(&[
                (CanonicalField::Date, "01/04/2021"),
                (CanonicalField::Description, "RALLY"),
                (CanonicalField::Amount, "-13.59"),
            ]))
            .unwrap();

        assert_eq!(record.extra_description(), "");
    }

    #[test]
    fn test_bad_date_is_malformed() {
        let builder = RecordBuilder::default();
        let result = builder.build(&row(&[
            (CanonicalField::Date, "2021-01-04"),
            (CanonicalField::Description, "RALLY"),
            (CanonicalField::Amount, "-13.59"),
        ]));
        assert!(matches!(result, Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_configured_date_format() {
        let builder = RecordBuilder::new("%Y-%m-%d");
        let record = builder
            .build(&row(&[
                (CanonicalField::Date, "2021-01-04"),
                (CanonicalField::Description, "RALLY"),
                (CanonicalField::Amount, "-13.59"),
            ]))
            .unwrap();
        assert_eq!(record.date(), NaiveDate::from_ymd_opt(2021, 1, 4).unwrap());
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let builder = RecordBuilder::default();

        let no_amount = builder.build(&row(&[
            (CanonicalField::Date, "01/04/2021"),
            (CanonicalField::Description, "RALLY"),
            (CanonicalField::Amount, "  "),
        ]));
        assert!(matches!(no_amount, Err(Error::MalformedRecord(_))));

        let no_description = builder.build(&row(&[
            (CanonicalField::Date, "01/04/2021"),
            (CanonicalField::Amount, "1.00"),
        ]));
        assert!(matches!(no_description, Err(Error::MalformedRecord(_))));
    }

    #[test]
    fn test_parse_plain_amounts() {
        assert_eq!(parse_amount("-10.02").unwrap(), dec("-10.02"));
        assert_eq!(parse_amount("100.25").unwrap(), dec("100.25"));
        assert_eq!(parse_amount("+7").unwrap(), dec("7"));
        assert_eq!(parse_amount(" 0.00 ").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_parse_formatted_amounts() {
        assert_eq!(parse_amount("$1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("-$1,234.56").unwrap(), dec("-1234.56"));
        assert_eq!(parse_amount("(12.00)").unwrap(), dec("-12"));
        assert_eq!(parse_amount("($1,000.00)").unwrap(), dec("-1000"));
        assert_eq!(parse_amount("12.50-").unwrap(), dec("-12.5"));
        assert_eq!(parse_amount("1 234,56 €").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("12,50").unwrap(), dec("12.5"));
        assert_eq!(parse_amount("1,234").unwrap(), dec("1234"));
        assert_eq!(parse_amount("1.234.567").unwrap(), dec("1234567"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "abc", "12a", "-", "$", "1-2", "()"] {
            assert!(
                matches!(parse_amount(raw), Err(Error::MalformedRecord(_))),
                "expected failure for {:?}",
                raw
            );
        }
    }
}
