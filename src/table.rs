use std::fmt;

/// A fully loaded source file: header names plus positionally aligned rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    /// Column names exactly as the source spells them (uncleaned, possibly repeated).
    pub columns: Vec<String>,
    /// Each data row, one cell per column.
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding with [`Cell::Missing`] (or truncating) to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    /// Iterate one column top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().filter_map(move |r| r.get(idx))
    }
}

/// A single value of the source file.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// No data at all; distinct from `Text("")` and from zero.
    Missing,
    Number(Number),
    Text(String),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Non-finite floats have no SQL literal, so they load as missing.
    pub fn float(f: f64) -> Self {
        if f.is_finite() {
            Cell::Number(Number::Float(f))
        } else {
            Cell::Missing
        }
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Number(Number::Int(i))
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

/// Numeric payload. Every variant displays as a plain, unquoted SQL literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    /// Always finite. `Display` never uses exponent notation.
    Float(f64),
    /// Source text kept verbatim (CSV), already validated as numeric.
    Literal(String),
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
            Number::Literal(s) => f.write_str(s),
        }
    }
}

/// True if `s` is an integer or finite float literal (`30`, `-1.5`, `2e3`, `.5`).
pub fn is_numeric_literal(s: &str) -> bool {
    if s.parse::<i64>().is_ok() {
        return true;
    }
    // f64 parsing also accepts "inf" and "NaN"; those are not SQL literals.
    s.bytes().any(|b| b.is_ascii_digit()) && s.parse::<f64>().is_ok_and(f64::is_finite)
}
