//! In-memory tabular value
//!
//! `SheetTable` is the common currency between the upload parser, the schema
//! classifier, the reconciliation engine, and the export serializer. Cells
//! stay as strings; numeric interpretation is done lazily and leniently
//! because uploaded sheets mix `4`, `4.0`, `"4,5"` and blanks freely.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A rectangular table: one header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell by row index and column name; `None` when either is missing.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// Parse a cell into a decimal quantity, tolerating thousands of real-world
/// spellings: surrounding whitespace, comma decimal separators, and embedded
/// spaces. Unparseable or blank cells yield `None`.
pub fn parse_decimal_cell(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| if ch == ',' { '.' } else { ch })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Parse a cell into an integer identifier, accepting `123`, `123.0`, and
/// padded spellings. Fractional values are rejected.
pub fn parse_id_cell(raw: &str) -> Option<i64> {
    let value = parse_decimal_cell(raw)?;
    if value.fract() == Decimal::ZERO {
        value.to_i64()
    } else {
        None
    }
}
