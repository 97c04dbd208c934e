//! Row mapper
//!
//! Maps each input row to one [`OutputRecord`]. Rows are independent and
//! never dropped: a date or balance that cannot be read becomes an empty
//! field and is recorded as a [`FieldFailure`].

use serde::Serialize;

use super::fields::{document_balance, document_date, transaction_type, verbatim};
use crate::models::{Cell, InputGrid, OutputRecord};

/// Input column indices (A-E).
pub const COL_DEBTOR_REFERENCE: usize = 0;
pub const COL_DOCUMENT_NUMBER: usize = 1;
pub const COL_DOCUMENT_DATE: usize = 2;
pub const COL_DOCUMENT_BALANCE: usize = 3;
pub const COL_TRANSACTION_TYPE: usize = 4;

static EMPTY_CELL: Cell = Cell::Empty;

/// A field that degraded to an empty string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    /// 0-based input row
    pub row: usize,
    /// Output header of the field
    pub field: &'static str,
    /// Raw input text
    pub value: String,
}

/// Result of mapping a whole grid
#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    /// One record per input row, in input order
    pub records: Vec<OutputRecord>,
    /// Non-empty dates and balances that could not be read
    pub failures: Vec<FieldFailure>,
}

impl TransformResult {
    /// Number of failures for one output field.
    pub fn failures_for(&self, field: &str) -> usize {
        self.failures.iter().filter(|f| f.field == field).count()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        format!(
            "Transformed: {} records, {} unreadable dates, {} unreadable balances",
            self.records.len(),
            self.failures_for("Document Date"),
            self.failures_for("Document Balance"),
        )
    }
}

/// Map every row of the grid, keeping input order.
pub fn transform(grid: &InputGrid) -> Vec<OutputRecord> {
    transform_with_report(grid).records
}

/// Map every row of the grid and collect field failures.
pub fn transform_with_report(grid: &InputGrid) -> TransformResult {
    let mut result = TransformResult::default();

    for (row_idx, row) in grid.rows().enumerate() {
        let (record, failures) = transform_row(row_idx, row);
        result.records.push(record);
        result.failures.extend(failures);
    }

    result
}

/// Map a single row. Columns past E are ignored; missing ones read as empty.
pub fn transform_row(row_idx: usize, row: &[Cell]) -> (OutputRecord, Vec<FieldFailure>) {
    let cell = |col: usize| row.get(col).unwrap_or(&EMPTY_CELL);
    let mut failures = Vec::new();

    let mut degrade = |field: &'static str, source: &Cell, value: Option<String>| {
        value.unwrap_or_else(|| {
            if !source.is_empty() {
                failures.push(FieldFailure {
                    row: row_idx,
                    field,
                    value: source.to_string(),
                });
            }
            String::new()
        })
    };

    let date_cell = cell(COL_DOCUMENT_DATE);
    let balance_cell = cell(COL_DOCUMENT_BALANCE);
    let document_date = degrade("Document Date", date_cell, document_date(date_cell));
    let document_balance = degrade("Document Balance", balance_cell, document_balance(balance_cell));

    let record = OutputRecord {
        debtor_reference: verbatim(cell(COL_DEBTOR_REFERENCE)),
        transaction_type: transaction_type(cell(COL_TRANSACTION_TYPE)),
        document_number: verbatim(cell(COL_DOCUMENT_NUMBER)),
        document_date,
        document_balance,
    };

    (record, failures)
}
