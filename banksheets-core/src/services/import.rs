//! Import service - reads bank export files into canonical records

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::CanonicalRecord;
use crate::ingest::{Diagnostic, SourceParser};

/// Per-file outcome
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub source: String,
    /// Matched layout, `None` when the file was skipped
    pub layout: Option<String>,
    pub records: usize,
}

/// Records read from one input path, in file then row order
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportBatch {
    pub records: Vec<CanonicalRecord>,
    pub files: Vec<FileSummary>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportBatch {
    pub fn skipped_files(&self) -> usize {
        self.files.iter().filter(|f| f.layout.is_none()).count()
    }
}

/// Import service for CSV exports
pub struct ImportService {
    parser: SourceParser,
}

impl ImportService {
    pub fn new(parser: SourceParser) -> Self {
        Self { parser }
    }

    /// The files an input path stands for: the file itself, or the `.csv`
    /// files directly inside a directory in name order
    pub fn collect_sources(path: &Path) -> Result<Vec<PathBuf>> {
        if path.is_file() {
            return Ok(vec![path.to_path_buf()]);
        }
        if !path.is_dir() {
            return Err(Error::NotFound(format!("{} does not exist", path.display())));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file = entry?.path();
            let is_csv = file
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("csv"))
                .unwrap_or(false);
            if file.is_file() && is_csv {
                files.push(file);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Read every source under `path`.
    ///
    /// Unreadable files, files without a header and files with an unknown
    /// layout are skipped with a diagnostic, as are malformed rows.
    pub fn read_path(&self, path: &Path) -> Result<ImportBatch> {
        let mut batch = ImportBatch::default();

        for file in Self::collect_sources(path)? {
            let source = file.display().to_string();
            let contents = std::fs::read_to_string(&file).map_err(Error::from);
            self.absorb(&mut batch, &source, contents);
        }

        Ok(batch)
    }

    /// Read one in-memory source
    pub fn read_str(&self, source: &str, contents: &str) -> ImportBatch {
        let mut batch = ImportBatch::default();
        self.absorb(&mut batch, source, Ok(contents.to_string()));
        batch
    }

    fn absorb(&self, batch: &mut ImportBatch, source: &str, contents: Result<String>) {
        let parsed = contents.and_then(|text| self.parser.parse(source, &text));

        match parsed {
            Ok(parsed) => {
                batch.files.push(FileSummary {
                    source: source.to_string(),
                    layout: Some(parsed.layout),
                    records: parsed.records.len(),
                });
                batch.records.extend(parsed.records);
                batch.diagnostics.extend(parsed.diagnostics);
            }
            Err(e) => {
                batch.files.push(FileSummary {
                    source: source.to_string(),
                    layout: None,
                    records: 0,
                });
                batch.diagnostics.push(Diagnostic::from_error(source, None, &e));
            }
        }
    }
}
