use std::fmt;
use tracing::debug;

use crate::table::{Cell, Table};

/// The two SQL types a column can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Numeric,
    Text,
}

impl ColumnType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "NUMERIC",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Trim, then turn every space and hyphen into an underscore.
pub fn clean_column_name(raw: &str) -> String {
    raw.trim().replace([' ', '-'], "_")
}

/// Decide a column's type from its first non-missing value only:
///  - Number ⇒ NUMERIC
///  - anything else ⇒ TEXT
///  - no values at all ⇒ TEXT
///
/// Later values are never consulted, even if they disagree.
pub fn infer_column_type<'a, I>(cells: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Cell>,
{
    match cells.into_iter().find(|c| !c.is_missing()) {
        Some(Cell::Number(_)) => ColumnType::Numeric,
        _ => ColumnType::Text,
    }
}

/// One `(cleaned name, type)` per column, in column order.
pub fn column_definitions(table: &Table) -> Vec<(String, ColumnType)> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, raw)| {
            let name = clean_column_name(raw);
            let ty = infer_column_type(table.column(idx));
            debug!(column = %name, column_type = %ty, "inferred column type");
            (name, ty)
        })
        .collect()
}
