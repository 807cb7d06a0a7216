// src/emit/mod.rs
pub mod columns;
pub mod script;

pub use columns::{clean_column_name, infer_column_type, ColumnType};
pub use script::{quote_text, render_value, SqlScript};

use chrono::{Local, NaiveDateTime};
use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::error::EmitError;
use crate::table::Table;

/// Timestamp part of every output file name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// How many `_N` suffixes to try when the plain name is taken.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Write `table` as `<table_name>_<YYYYMMDD_HHMMSS>.sql` inside `out_dir`,
/// stamped with the current local time. Returns the path written.
pub fn emit_script<P: AsRef<Path>>(
    table: &Table,
    table_name: &str,
    out_dir: P,
) -> Result<PathBuf, EmitError> {
    emit_script_at(table, table_name, out_dir, Local::now().naive_local())
}

/// Same as [`emit_script`] with an explicit timestamp.
#[tracing::instrument(level = "debug", skip(table, out_dir), fields(dir = %out_dir.as_ref().display()))]
pub fn emit_script_at<P: AsRef<Path>>(
    table: &Table,
    table_name: &str,
    out_dir: P,
    stamp: NaiveDateTime,
) -> Result<PathBuf, EmitError> {
    let out_dir = out_dir.as_ref();
    let base = format!("{}_{}", table_name, stamp.format(TIMESTAMP_FORMAT));
    let script = SqlScript::new(table, table_name);

    let (path, file) = create_unique(out_dir, &base)?;
    let mut writer = BufWriter::new(file);
    script
        .write_to(&mut writer)
        .and_then(|_| writer.flush())
        .map_err(|source| EmitError::Write {
            path: path.clone(),
            source,
        })?;

    info!(
        path = %path.display(),
        columns = script.columns().len(),
        rows = table.rows.len(),
        "wrote sql script"
    );
    Ok(path)
}

/// Claim `<base>.sql`, or `<base>_1.sql`, `<base>_2.sql`, … if taken.
fn create_unique(dir: &Path, base: &str) -> Result<(PathBuf, File), EmitError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = match attempt {
            0 => format!("{}.sql", base),
            n => format!("{}_{}.sql", base, n),
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "output name taken, trying next suffix");
            }
            Err(source) => return Err(EmitError::Write { path, source }),
        }
    }
    Err(EmitError::NameExhausted {
        dir: dir.to_path_buf(),
        base: base.to_string(),
        attempts: MAX_NAME_ATTEMPTS,
    })
}
