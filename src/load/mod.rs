// src/load/mod.rs
pub mod csv;
pub mod spreadsheet;

use std::{fmt, path::Path};
use tracing::debug;

use crate::error::LoadError;
use crate::table::Table;

/// Spellings that load as a missing value when they appear unquoted in a CSV
/// field or as a whole spreadsheet string.
pub const DEFAULT_NULL_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Which decoder a source file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Delimited text (`.csv`).
    Csv,
    /// BIFF workbook (`.xls`).
    LegacySpreadsheet,
    /// OOXML workbook (`.xlsx`).
    ModernSpreadsheet,
}

impl FileKind {
    /// Map a bare extension (no dot, any case) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(FileKind::Csv),
            "xls" => Some(FileKind::LegacySpreadsheet),
            "xlsx" => Some(FileKind::ModernSpreadsheet),
            _ => None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileKind::Csv => "csv",
            FileKind::LegacySpreadsheet => "xls",
            FileKind::ModernSpreadsheet => "xlsx",
        })
    }
}

/// Knobs for the loader. Defaults match what the upload service uses.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// CSV field delimiter.
    pub delimiter: u8,
    /// Exact spellings that mean "missing".
    pub null_tokens: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            null_tokens: DEFAULT_NULL_TOKENS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    pub fn is_null_token(&self, s: &str) -> bool {
        self.null_tokens.iter().any(|t| t == s)
    }
}

/// Read `path` into memory as a [`Table`], using the decoder for `kind`.
#[tracing::instrument(level = "debug", skip(path, options), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(
    path: P,
    kind: FileKind,
    options: &LoadOptions,
) -> Result<Table, LoadError> {
    let path = path.as_ref();
    let table = match kind {
        FileKind::Csv => {
            let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            csv::parse_csv(&bytes, path, options)?
        }
        FileKind::LegacySpreadsheet => spreadsheet::read_xls(path, options)?,
        FileKind::ModernSpreadsheet => spreadsheet::read_xlsx(path, options)?,
    };
    debug!(
        columns = table.columns.len(),
        rows = table.rows.len(),
        "loaded table"
    );
    Ok(table)
}
