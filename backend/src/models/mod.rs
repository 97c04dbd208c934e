//! Domain models for the Tynic conversion pipeline.
//!
//! - [`Cell`] - A raw value read from the uploaded table
//! - [`InputGrid`] - Header-less grid of cells, row 0 is data
//! - [`OutputRecord`] - One standardized five-column record
//! - [`OutputTable`] - The ordered records plus their fixed headers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum number of input columns (A-E).
pub const REQUIRED_COLUMNS: usize = 5;

/// Output column headers, in output order.
pub const OUTPUT_HEADERS: [&str; 5] = [
    "Debtor Reference",
    "Transaction Type",
    "Document Number",
    "Document Date",
    "Document Balance",
];

// =============================================================================
// Cell
// =============================================================================

/// A raw cell value.
///
/// CSV input only yields [`Cell::String`] and [`Cell::Empty`]; spreadsheets
/// keep their native cell types.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing or blank cell
    Empty,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point number
    Float(f64),
    /// Text value, kept verbatim
    String(String),
    /// Date/time value
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Int(i) => write!(f, "{}", i),
            // Whole numbers from spreadsheets render without a trailing ".0"
            Cell::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 => {
                write!(f, "{}", *x as i64)
            }
            Cell::Float(x) => write!(f, "{}", x),
            Cell::String(s) => f.write_str(s),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::String(s.to_string())
        }
    }
}

// =============================================================================
// Input Grid
// =============================================================================

/// Header-less table read from the upload.
///
/// Every row is padded with [`Cell::Empty`] up to [`InputGrid::width`], so
/// any column index below the width is addressable on every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputGrid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl InputGrid {
    /// Build a grid from ragged rows. The width is the longest row.
    pub fn from_rows(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows, width }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }
}

// =============================================================================
// Output
// =============================================================================

/// One standardized output record.
///
/// Field order is the output column order; serde names are the headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Debtor Reference")]
    pub debtor_reference: String,
    #[serde(rename = "Transaction Type")]
    pub transaction_type: String,
    #[serde(rename = "Document Number")]
    pub document_number: String,
    #[serde(rename = "Document Date")]
    pub document_date: String,
    #[serde(rename = "Document Balance")]
    pub document_balance: String,
}

impl OutputRecord {
    /// Values in output column order.
    pub fn values(&self) -> [&str; 5] {
        [
            self.debtor_reference.as_str(),
            self.transaction_type.as_str(),
            self.document_number.as_str(),
            self.document_date.as_str(),
            self.document_balance.as_str(),
        ]
    }
}

/// The converted table, ready for preview or download.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputTable {
    pub columns: Vec<String>,
    pub records: Vec<OutputRecord>,
}

impl OutputTable {
    pub fn new(records: Vec<OutputRecord>) -> Self {
        Self {
            columns: OUTPUT_HEADERS.iter().map(|h| h.to_string()).collect(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
