use std::{
    fmt,
    io::{self, Write},
};

use super::columns::{column_definitions, ColumnType};
use crate::table::{Cell, Table};

/// A `CREATE TABLE` plus one `INSERT` per row, ready to be written out.
pub struct SqlScript<'a> {
    table: &'a Table,
    table_name: &'a str,
    columns: Vec<(String, ColumnType)>,
}

impl<'a> SqlScript<'a> {
    /// Cleans names and infers types once; rows are rendered lazily on write.
    pub fn new(table: &'a Table, table_name: &'a str) -> Self {
        Self {
            table,
            table_name,
            columns: column_definitions(table),
        }
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }

    /// Stream the script into `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{}", self)
    }

    /// The whole script as a string.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SqlScript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CREATE TABLE IF NOT EXISTS {} (", self.table_name)?;
        let defs: Vec<String> = self
            .columns
            .iter()
            .map(|(name, ty)| format!("    {} {}", name, ty))
            .collect();
        f.write_str(&defs.join(",\n"))?;
        f.write_str("\n);\n\n")?;

        let width = self.columns.len();
        for row in &self.table.rows {
            let values: Vec<String> = (0..width)
                .map(|i| render_value(row.get(i).unwrap_or(&Cell::Missing)))
                .collect();
            writeln!(
                f,
                "INSERT INTO {} VALUES ({});",
                self.table_name,
                values.join(", ")
            )?;
        }
        Ok(())
    }
}

/// SQL literal for one cell. Decided per value, never from the column type.
pub fn render_value(cell: &Cell) -> String {
    match cell {
        Cell::Missing => "NULL".to_string(),
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => quote_text(s),
    }
}

/// Single-quote `s`, doubling embedded quotes. Nothing else is escaped.
pub fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
