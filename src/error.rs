use std::{io, path::PathBuf};
use thiserror::Error;

/// Input could not be turned into a [`Table`](crate::table::Table).
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} has no header row")]
    Empty(PathBuf),

    #[error("record {record} has {found} fields, but the header has {expected}")]
    FieldCount {
        record: usize,
        expected: usize,
        found: usize,
    },

    #[error("record {record}, column {column} is not valid UTF-8")]
    Encoding { record: usize, column: usize },

    #[error("failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },
}

/// The SQL script could not be written.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to write SQL script {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no free file name for {base}.sql in {dir} after {attempts} attempts")]
    NameExhausted {
        dir: PathBuf,
        base: String,
        attempts: usize,
    },
}

/// Either half of a conversion failed.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}
