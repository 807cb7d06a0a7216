// src/bin/convert.rs
use anyhow::{bail, Context, Result};
use clap::Parser;
use sheetsql::{
    convert,
    naming::derive_table_name,
    ConvertOptions, FileKind,
};
use std::{fs, path::PathBuf};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "convert")]
#[command(about = "Convert CSV/XLS/XLSX files into SQL scripts without running the service")]
struct Args {
    /// Input files (.csv, .xls, .xlsx)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for generated scripts (created if missing)
    #[arg(short, long, default_value = "downloads")]
    output_dir: PathBuf,

    /// Table name to use instead of the one derived from each file name
    #[arg(short, long)]
    table_name: Option<String>,

    /// CSV field delimiter
    #[arg(short, long, default_value_t = ',', value_parser = parse_delimiter)]
    delimiter: char,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_delimiter(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!("delimiter must be a single ASCII character, got {s:?}")),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let mut options = ConvertOptions::new(&args.output_dir);
    options.load.delimiter = args.delimiter as u8;

    let mut failed = 0usize;
    for file in &args.files {
        let Some(kind) = FileKind::from_path(file) else {
            error!(file = %file.display(), "unsupported extension, expected .csv, .xls or .xlsx");
            failed += 1;
            continue;
        };
        let table_name = match &args.table_name {
            Some(name) => name.clone(),
            None => derive_table_name(&file.file_name().unwrap_or_default().to_string_lossy()),
        };

        match convert(file, kind, &table_name, &options) {
            Ok(out) => info!("{} → {}", file.display(), out.display()),
            Err(e) => {
                error!(file = %file.display(), "conversion failed: {}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, args.files.len());
    }
    Ok(())
}
