// src/load/csv.rs
use csv_core::{ReadFieldResult, ReaderBuilder};
use std::path::Path;
use tracing::trace;

use super::LoadOptions;
use crate::error::LoadError;
use crate::table::{is_numeric_literal, Cell, Number, Table};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const QUOTE: u8 = b'"';

/// One undecoded field plus whether the source wrapped it in quotes.
#[derive(Debug)]
struct RawField {
    bytes: Vec<u8>,
    quoted: bool,
}

/// Parse an in-memory CSV document. The first non-blank record is the header.
///
/// Records are numbered from 1 (the header) in error messages; columns too.
pub fn parse_csv(input: &[u8], source: &Path, options: &LoadOptions) -> Result<Table, LoadError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let mut records = split_records(input, options.delimiter)
        .into_iter()
        .filter(|r| !is_blank(r))
        .zip(1usize..);

    let (header, _) = records
        .next()
        .ok_or_else(|| LoadError::Empty(source.to_path_buf()))?;
    let columns = header
        .into_iter()
        .enumerate()
        .map(|(col, f)| decode(f.bytes, 1, col + 1))
        .collect::<Result<Vec<_>, _>>()?;

    let mut table = Table::new(columns);
    for (record, number) in records {
        if record.len() > table.columns.len() {
            return Err(LoadError::FieldCount {
                record: number,
                expected: table.columns.len(),
                found: record.len(),
            });
        }
        let mut row = Vec::with_capacity(table.columns.len());
        for (col, field) in record.into_iter().enumerate() {
            let quoted = field.quoted;
            let text = decode(field.bytes, number, col + 1)?;
            row.push(classify(text, quoted, options));
        }
        table.push_row(row);
    }

    trace!(rows = table.rows.len(), "parsed csv");
    Ok(table)
}

/// Decide what a single decoded field means.
fn classify(text: String, quoted: bool, options: &LoadOptions) -> Cell {
    if quoted {
        return Cell::Text(text);
    }
    if options.is_null_token(&text) {
        return Cell::Missing;
    }
    let trimmed = text.trim();
    if is_numeric_literal(trimmed) {
        return Cell::Number(Number::Literal(trimmed.to_string()));
    }
    Cell::Text(text)
}

fn decode(bytes: Vec<u8>, record: usize, column: usize) -> Result<String, LoadError> {
    String::from_utf8(bytes).map_err(|_| LoadError::Encoding { record, column })
}

/// A line with nothing on it.
fn is_blank(record: &[RawField]) -> bool {
    matches!(record, [only] if only.bytes.is_empty() && !only.quoted)
}

/// Drive the csv-core state machine over the whole buffer, keeping track of
/// the raw byte span each field was read from so quoting can be recovered.
fn split_records(input: &[u8], delimiter: u8) -> Vec<Vec<RawField>> {
    let mut rdr = ReaderBuilder::new().delimiter(delimiter).build();
    let mut out = [0u8; 4096];
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = Vec::new();
    let mut pos = 0;
    let mut field_start = 0;

    loop {
        // once `pos` reaches the end this passes an empty slice, which csv-core reads as EOF
        let (result, nin, nout) = rdr.read_field(&input[pos..], &mut out);
        field.extend_from_slice(&out[..nout]);
        pos += nin;

        match result {
            ReadFieldResult::InputEmpty | ReadFieldResult::OutputFull => {}
            ReadFieldResult::Field { record_end } => {
                // The span only ever holds separators besides the field itself,
                // so any quote byte in it belongs to this field.
                let quoted = input[field_start..pos].contains(&QUOTE);
                record.push(RawField {
                    bytes: std::mem::take(&mut field),
                    quoted,
                });
                field_start = pos;
                if record_end {
                    records.push(std::mem::take(&mut record));
                }
            }
            ReadFieldResult::End => break,
        }
    }

    records
}
