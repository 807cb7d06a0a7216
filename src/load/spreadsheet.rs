// src/load/spreadsheet.rs
use calamine::{open_workbook, Data, DataType, Range, Reader, Xls, Xlsx};
use std::{
    fmt::Display,
    fs::File,
    io::BufReader,
    path::Path,
};
use tracing::{debug, warn};

use super::LoadOptions;
use crate::error::LoadError;
use crate::table::{Cell, Table};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read the first worksheet of a BIFF (`.xls`) workbook.
pub fn read_xls(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let workbook: Xls<BufReader<File>> =
        open_workbook(path).map_err(|e| spreadsheet_error(path, e))?;
    read_first_sheet(workbook, path, options)
}

/// Read the first worksheet of an OOXML (`.xlsx`) workbook.
pub fn read_xlsx(path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let workbook: Xlsx<BufReader<File>> =
        open_workbook(path).map_err(|e| spreadsheet_error(path, e))?;
    read_first_sheet(workbook, path, options)
}

fn read_first_sheet<R>(mut workbook: R, path: &Path, options: &LoadOptions) -> Result<Table, LoadError>
where
    R: Reader<BufReader<File>>,
    R::Error: Display,
{
    let sheet_names = workbook.sheet_names();
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Spreadsheet {
            path: path.to_path_buf(),
            message: "workbook contains no worksheets".into(),
        })?
        .map_err(|e| spreadsheet_error(path, e))?;

    debug!(
        sheet = sheet_names.first().map(String::as_str).unwrap_or_default(),
        sheets = sheet_names.len(),
        "reading first worksheet"
    );
    range_to_table(&range, path, options)
}

/// First row of the used range is the header; every later row is data,
/// including rows that are entirely empty.
fn range_to_table(range: &Range<Data>, path: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| LoadError::Empty(path.to_path_buf()))?;

    let mut table = Table::new(header.iter().map(header_text).collect());
    for row in rows {
        table.push_row(row.iter().map(|c| to_cell(c, options)).collect());
    }
    Ok(table)
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => match to_cell(other, &LoadOptions::default()) {
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s,
            Cell::Missing => other.to_string(),
        },
    }
}

fn to_cell(cell: &Data, options: &LoadOptions) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Missing,
        Data::Int(i) => Cell::from(*i),
        Data::Float(f) => Cell::float(*f),
        Data::Bool(b) => Cell::from(i64::from(*b)),
        Data::String(s) if options.is_null_token(s) => Cell::Missing,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(dt) => Cell::Text(dt.format(DATETIME_FORMAT).to_string()),
            None => {
                warn!(value = %cell, "date cell outside the calendar, keeping serial number");
                cell.as_f64().map(Cell::float).unwrap_or(Cell::Missing)
            }
        },
    }
}

fn spreadsheet_error(path: &Path, err: impl Display) -> LoadError {
    LoadError::Spreadsheet {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
