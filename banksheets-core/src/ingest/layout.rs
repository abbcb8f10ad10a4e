//! Layout registry - maps institution-specific headers to canonical fields

use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::domain::{CanonicalField, MappedRow};

/// One source column and where it lands; `None` drops the column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutColumn {
    pub header: String,
    #[serde(default)]
    pub field: Option<CanonicalField>,
}

impl LayoutColumn {
    pub fn mapped(header: &str, field: CanonicalField) -> Self {
        Self {
            header: header.to_string(),
            field: Some(field),
        }
    }

    pub fn ignored(header: &str) -> Self {
        Self {
            header: header.to_string(),
            field: None,
        }
    }
}

/// A known export layout, identified by its exact ordered header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub name: String,
    pub columns: Vec<LayoutColumn>,
}

impl Layout {
    pub fn new(name: impl Into<String>, columns: Vec<LayoutColumn>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Header names in order
    pub fn signature(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.header.as_str()).collect()
    }

    /// Whether a header tuple is this layout (order-sensitive, trailing
    /// whitespace ignored)
    pub fn matches(&self, header: &[String]) -> bool {
        header.len() == self.columns.len()
            && self
                .columns
                .iter()
                .zip(header)
                .all(|(column, name)| column.header.trim_end() == name.trim_end())
    }

    /// Source column -> canonical field, ignored columns dropped
    pub fn mapping(&self) -> Vec<(&str, CanonicalField)> {
        self.columns
            .iter()
            .filter_map(|c| c.field.map(|f| (c.header.as_str(), f)))
            .collect()
    }

    /// Map one data row by column position
    pub fn map_row<'a, I>(&self, values: I) -> MappedRow
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.columns
            .iter()
            .zip(values)
            .filter_map(|(column, value)| column.field.map(|f| (f, value.trim().to_string())))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        for required in [
            CanonicalField::Date,
            CanonicalField::Amount,
            CanonicalField::Description,
        ] {
            if !self.columns.iter().any(|c| c.field == Some(required)) {
                return Err(Error::Config(format!(
                    "layout '{}' has no column for {}",
                    self.name, required
                )));
            }
        }
        Ok(())
    }
}

/// Registry of known layouts, built-ins first
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    layouts: Vec<Layout>,
}

impl LayoutRegistry {
    /// Registry holding only the built-in layouts
    pub fn builtin() -> Self {
        use CanonicalField::*;

        let credit_card = Layout::new(
            "credit-card",
            vec![
                LayoutColumn::mapped("Posted Date", Date),
                LayoutColumn::mapped("Reference Number", ExtraDescription),
                LayoutColumn::mapped("Payee", Description),
                LayoutColumn::ignored("Address"),
                LayoutColumn::mapped("Amount", Amount),
            ],
        );

        let checking = Layout::new(
            "checking",
            vec![
                LayoutColumn::mapped("Date", Date),
                LayoutColumn::mapped("Description", Description),
                LayoutColumn::mapped("Amount", Amount),
                LayoutColumn::ignored("Running Bal."),
            ],
        );

        Self {
            layouts: vec![credit_card, checking],
        }
    }

    /// Built-ins plus custom layouts, consulted in that order
    pub fn with_custom(custom: impl IntoIterator<Item = Layout>) -> Result<Self> {
        let mut registry = Self::builtin();
        for layout in custom {
            registry.register(layout)?;
        }
        Ok(registry)
    }

    /// Add a layout after the existing ones
    pub fn register(&mut self, layout: Layout) -> Result<()> {
        layout.validate()?;
        if self.layouts.iter().any(|l| l.name == layout.name) {
            return Err(Error::Config(format!(
                "layout '{}' is already registered",
                layout.name
            )));
        }
        self.layouts.push(layout);
        Ok(())
    }

    /// Find the layout for an exact header tuple
    pub fn lookup(&self, header: &[String]) -> Result<&Layout> {
        self.layouts
            .iter()
            .find(|layout| layout.matches(header))
            .ok_or_else(|| {
                let names: Vec<&str> = header.iter().map(|h| h.trim_end()).collect();
                Error::UnknownLayout(format!("{:?}", names))
            })
    }

    pub fn layouts(&self) -> &[Layout] {
        &self.layouts
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_credit_card_mapping() {
        let registry = LayoutRegistry::builtin();
        let layout = registry
            .lookup(&header(&["Posted Date", "Reference Number", "Payee", "Address", "Amount"]))
            .unwrap();

        assert_eq!(layout.name, "credit-card");
        assert_eq!(
            layout.mapping(),
            vec![
                ("Posted Date", CanonicalField::Date),
                ("Reference Number", CanonicalField::ExtraDescription),
                ("Payee", CanonicalField::Description),
                ("Amount", CanonicalField::Amount),
            ]
        );
    }

    #[test]
    fn test_checking_mapping_with_trailing_whitespace() {
        let registry = LayoutRegistry::builtin();
        let layout = registry
            .lookup(&header(&["Date", "Description ", "Amount", "Running Bal.  "]))
            .unwrap();

        assert_eq!(layout.name, "checking");
        assert_eq!(
            layout.mapping(),
            vec![
                ("Date", CanonicalField::Date),
                ("Description", CanonicalField::Description),
                ("Amount", CanonicalField::Amount),
            ]
        );
    }

    #[test]
    fn test_unknown_layout() {
        let registry = LayoutRegistry::builtin();
        let result = registry.lookup(&header(&["P Date", "Amount"]));
        assert!(matches!(result, Err(Error::UnknownLayout(_))));
    }

    #[test]
    fn test_order_sensitive() {
        let registry = LayoutRegistry::builtin();
        let result = registry.lookup(&header(&["Description", "Date", "Amount", "Running Bal."]));
        assert!(matches!(result, Err(Error::UnknownLayout(_))));
    }

    #[test]
    fn test_map_row_drops_ignored_columns() {
        let registry = LayoutRegistry::builtin();
        let layout = registry
            .lookup(&header(&["Posted Date", "Reference Number", "Payee", "Address", "Amount"]))
            .unwrap();

        let row = layout.map_row(["02/11/2021", "4910911", "Popeyes", "Frankfurt IL ", "-10.02"]);
        assert_eq!(row.len(), 4);
        assert_eq!(row[&CanonicalField::Description], "Popeyes");
        assert_eq!(row[&CanonicalField::ExtraDescription], "4910911");
        assert_eq!(row[&CanonicalField::Amount], "-10.02");
    }

    #[test]
    fn test_short_row_leaves_fields_missing() {
        let registry = LayoutRegistry::builtin();
        let layout = registry
            .lookup(&header(&["Date", "Description", "Amount", "Running Bal."]))
            .unwrap();

        let row = layout.map_row(["01/04/2021", "RALLY"]);
        assert!(!row.contains_key(&CanonicalField::Amount));
    }

    #[test]
    fn test_custom_layout() {
        let custom = Layout::new(
            "savings",
            vec![
                LayoutColumn::mapped("Booked", CanonicalField::Date),
                LayoutColumn::mapped("Text", CanonicalField::Description),
                LayoutColumn::mapped("Value", CanonicalField::Amount),
            ],
        );
        let registry = LayoutRegistry::with_custom(vec![custom]).unwrap();

        assert_eq!(registry.layouts().len(), 3);
        let layout = registry.lookup(&header(&["Booked", "Text", "Value"])).unwrap();
        assert_eq!(layout.name, "savings");
    }

    #[test]
    fn test_custom_layout_requires_core_fields() {
        let custom = Layout::new(
            "broken",
            vec![
                LayoutColumn::mapped("Booked", CanonicalField::Date),
                LayoutColumn::mapped("Value", CanonicalField::Amount),
            ],
        );
        assert!(matches!(
            LayoutRegistry::with_custom(vec![custom]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_duplicate_layout_name_rejected() {
        let mut registry = LayoutRegistry::builtin();
        let copy = registry.layouts()[1].clone();
        assert!(registry.register(copy).is_err());
    }
}
