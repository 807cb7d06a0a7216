use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::emit::emit_script;
use crate::error::ConvertError;
use crate::load::{load_table, FileKind, LoadOptions};

/// Everything a conversion needs besides the input itself.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Where generated scripts are written. Must already exist.
    pub output_dir: PathBuf,
    pub load: LoadOptions,
}

impl ConvertOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            load: LoadOptions::default(),
        }
    }
}

/// Load `file_path` as `kind`, then write `<table_name>_<timestamp>.sql` into
/// the configured output directory. Returns the script's path.
#[tracing::instrument(level = "debug", skip(file_path, options), fields(path = %file_path.as_ref().display()))]
pub fn convert<P: AsRef<Path>>(
    file_path: P,
    kind: FileKind,
    table_name: &str,
    options: &ConvertOptions,
) -> Result<PathBuf, ConvertError> {
    let start = Instant::now();
    let table = load_table(file_path, kind, &options.load)?;
    let out = emit_script(&table, table_name, &options.output_dir)?;
    debug!(elapsed = ?start.elapsed(), "conversion finished");
    Ok(out)
}
