//! Alias service - friendly names for raw bank descriptions

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::{Error, Result};
use crate::domain::{Description, DescriptionPattern};

/// Descriptions touched by an alias change
#[derive(Debug, Clone, Serialize)]
pub struct AliasResult {
    pub alias: String,
    pub matched: Vec<String>,
    pub changed: usize,
}

pub struct AliasService {
    repository: Arc<DuckDbRepository>,
}

impl AliasService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Descriptions without any alias, by name
    pub fn missing(&self) -> Result<Vec<Description>> {
        self.repository.descriptions_without_alias()
    }

    /// Add `alias` to every description matching `pattern`
    pub fn create(&self, pattern: &str, alias: &str) -> Result<AliasResult> {
        let (alias, matched) = self.matches(pattern, alias)?;
        let ids: Vec<i64> = matched.iter().map(|d| d.id).collect();
        let changed = self.repository.add_alias(&ids, &alias)?;

        Ok(AliasResult {
            alias,
            matched: matched.into_iter().map(|d| d.name).collect(),
            changed,
        })
    }

    /// Make `alias` the only alias of every description matching `pattern`
    pub fn replace(&self, pattern: &str, alias: &str) -> Result<AliasResult> {
        let (alias, matched) = self.matches(pattern, alias)?;
        let ids: Vec<i64> = matched.iter().map(|d| d.id).collect();
        let changed = self.repository.replace_alias(&ids, &alias)?;

        Ok(AliasResult {
            alias,
            matched: matched.into_iter().map(|d| d.name).collect(),
            changed,
        })
    }

    fn matches(&self, pattern: &str, alias: &str) -> Result<(String, Vec<Description>)> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(Error::invalid_argument("alias name is empty"));
        }
        if pattern.trim().is_empty() {
            return Err(Error::invalid_argument("description pattern is empty"));
        }

        let matched = self
            .repository
            .find_descriptions(&DescriptionPattern::new(pattern))?;
        if matched.is_empty() {
            return Err(Error::NotFound(format!("no description matches '{}'", pattern)));
        }

        Ok((alias.to_string(), matched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CanonicalRecord;
    use crate::ports::LedgerStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn service() -> AliasService {
        let repo = DuckDbRepository::in_memory().unwrap();
        repo.ensure_schema().unwrap();
        let date = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        repo.stage_records(&[
            CanonicalRecord::new(date, Decimal::ONE, "AMZN Mktp US*1A2B3", "").unwrap(),
            CanonicalRecord::new(date, Decimal::TWO, "AMZN Mktp US*9Z8Y7", "").unwrap(),
            CanonicalRecord::new(date, Decimal::TEN, "Popeyes", "").unwrap(),
        ])
        .unwrap();
        AliasService::new(Arc::new(repo))
    }

    #[test]
    fn test_create_with_wildcard() {
        let service = service();
        let result = service.create("AMZN%", "Amazon").unwrap();
        assert_eq!(result.matched.len(), 2);
        assert_eq!(result.changed, 2);

        let missing = service.missing().unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "Popeyes");
    }

    #[test]
    fn test_exact_match_and_replace() {
        let service = service();
        service.create("Popeyes", "Chicken").unwrap();
        let result = service.replace("Popeyes", "Fast food").unwrap();
        assert_eq!(result.matched, vec!["Popeyes"]);
        assert_eq!(service.missing().unwrap().len(), 2);
    }

    #[test]
    fn test_patterns_ignore_case() {
        let service = service();
        let result = service.create("popeyes%", "Chicken").unwrap();
        assert_eq!(result.matched, vec!["Popeyes"]);

        let result = service.replace("POPEYES", "Fast food").unwrap();
        assert_eq!(result.matched, vec!["Popeyes"]);
    }

    #[test]
    fn test_errors() {
        let service = service();
        assert!(matches!(service.create("Nobody", "X"), Err(Error::NotFound(_))));
        assert!(matches!(service.create("Popeyes", "  "), Err(Error::InvalidArgument(_))));
    }
}
