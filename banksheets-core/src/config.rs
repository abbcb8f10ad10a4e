//! Configuration management
//!
//! `settings.json` in the data directory:
//! ```json
//! {
//!   "import": {
//!     "delimiter": ",",
//!     "dateFormat": "%m/%d/%Y",
//!     "layouts": [
//!       { "name": "savings", "columns": [
//!         { "header": "Booked", "field": "date" },
//!         { "header": "Text", "field": "description" },
//!         { "header": "Value", "field": "amount" },
//!         { "header": "Balance" }
//!       ] }
//!     ]
//!   },
//!   "reconcile": { "autoResolve": false }
//! }
//! ```

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::ingest::{Layout, LayoutRegistry, RecordBuilder, SourceParser, DEFAULT_DATE_FORMAT};

const SETTINGS_FILE: &str = "settings.json";
const AUTO_RESOLVE_ENV: &str = "BANKSHEETS_AUTO_RESOLVE";

/// Raw settings.json structure; keys this crate does not know are ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    reconcile: ReconcileSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportSettings {
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default)]
    date_format: Option<String>,
    #[serde(default)]
    layouts: Vec<Layout>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReconcileSettings {
    #[serde(default)]
    auto_resolve: bool,
}

/// Banksheets configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub delimiter: u8,
    pub date_format: String,
    pub layouts: Vec<Layout>,
    /// Resolve duplicates with the automatic policy instead of prompting
    pub auto_resolve: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            delimiter: b',',
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            layouts: Vec::new(),
            auto_resolve: false,
        }
    }
}

fn parse_delimiter(raw: &str) -> Result<u8> {
    let raw = if raw == "\\t" { "\t" } else { raw };
    match raw.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => bail!("delimiter must be a single ASCII character, got {:?}", raw),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" | "yes" | "TRUE" | "YES" => Some(true),
        "false" | "0" | "no" | "FALSE" | "NO" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A missing file yields defaults. Automatic resolution can also be
    /// switched via the BANKSHEETS_AUTO_RESOLVE environment variable.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)
                .with_context(|| format!("Failed to read {}", settings_path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?
        } else {
            SettingsFile::default()
        };

        let delimiter = match raw.import.delimiter.as_deref() {
            Some(d) => parse_delimiter(d)?,
            None => b',',
        };

        let auto_resolve = std::env::var(AUTO_RESOLVE_ENV)
            .ok()
            .as_deref()
            .and_then(parse_flag)
            .unwrap_or(raw.reconcile.auto_resolve);

        Ok(Self {
            delimiter,
            date_format: raw
                .import
                .date_format
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string()),
            layouts: raw.import.layouts,
            auto_resolve,
        })
    }

    /// Built-in layouts followed by the configured ones
    pub fn layout_registry(&self) -> Result<LayoutRegistry> {
        Ok(LayoutRegistry::with_custom(self.layouts.iter().cloned())?)
    }

    /// Parser wired with this configuration's layouts, date format and delimiter
    pub fn source_parser(&self) -> Result<SourceParser> {
        Ok(SourceParser::new(
            self.layout_registry()?,
            RecordBuilder::new(self.date_format.clone()),
            self.delimiter,
        ))
    }
}
