//! High-level pipeline API: upload bytes in, converted table out.
//!
//! [`convert`] is the bare parse → transform step with no side effects.
//! [`process_bytes`] and [`process_file`] run the same step and also report
//! progress to the log stream, returning source metadata and field
//! failures next to the table.
//!
//! # Example
//!
//! ```rust,ignore
//! use tynic::{process_file, export};
//!
//! let result = process_file("ledger.xlsx")?;
//! export::write_file("tynic_upload.csv", &result.table.records)?;
//! ```

use serde::Serialize;
use std::path::Path;

use super::mapper::{transform_with_report, FieldFailure};
use crate::api::logs::{log_error, log_info, log_success, log_warning, log_warning_indent};
use crate::error::{IngestResult, PipelineError};
use crate::export::{self, Download};
use crate::models::{OutputTable, REQUIRED_COLUMNS};
use crate::parser::{self, ParseResult};

/// Maximum number of failing cells echoed to the log per upload
const MAX_LOGGED_FAILURES: usize = 5;

/// Where the table came from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub file_name: String,
    pub kind: String,
    pub encoding: Option<String>,
    pub row_count: usize,
    pub column_count: usize,
}

/// Result of a complete conversion
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// The converted table, one record per input row
    pub table: OutputTable,
    /// Source file metadata
    pub source: SourceInfo,
    /// Dates and balances that degraded to empty
    pub failures: Vec<FieldFailure>,
}

impl ConversionResult {
    pub fn date_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.field == "Document Date").count()
    }

    pub fn balance_failures(&self) -> usize {
        self.failures.iter().filter(|f| f.field == "Document Balance").count()
    }

    /// The CSV download artifact for this table.
    pub fn download(&self) -> Result<Download, PipelineError> {
        Ok(export::download(&self.table.records)?)
    }
}

/// Parse and transform an upload. Pure: no logging, no I/O.
pub fn convert(bytes: &[u8], file_name: &str) -> IngestResult<OutputTable> {
    let grid = parser::parse(bytes, file_name)?;
    Ok(OutputTable::new(super::mapper::transform(&grid)))
}

/// Convert upload bytes, reporting progress to the log stream.
pub fn process_bytes(bytes: &[u8], file_name: &str) -> Result<ConversionResult, PipelineError> {
    log_info(format!("📖 Reading {} ({} bytes)...", file_name, bytes.len()));

    let parsed = parser::parse_with_metadata(bytes, file_name).map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    Ok(run(parsed, file_name))
}

/// Convert a file from disk, reporting progress to the log stream.
pub fn process_file<P: AsRef<Path>>(path: P) -> Result<ConversionResult, PipelineError> {
    let path = path.as_ref();
    log_info(format!("📖 Reading {}...", path.display()));

    let parsed = parser::parse_file(path).map_err(|e| {
        log_error(e.to_string());
        e
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(run(parsed, &file_name))
}

/// Convert a file and write the CSV artifact to `output`.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
) -> Result<ConversionResult, PipelineError> {
    let result = process_file(input)?;
    export::write_file(output.as_ref(), &result.table.records)?;
    log_success(format!("💾 Written to {}", output.as_ref().display()));
    Ok(result)
}

fn run(parsed: ParseResult, file_name: &str) -> ConversionResult {
    let ParseResult { grid, kind, encoding } = parsed;

    log_success(format!("Detected format: {}", kind.label()));
    if let Some(ref enc) = encoding {
        log_success(format!("Detected encoding: {}", enc));
    }
    log_success(format!("Read {} rows, {} columns", grid.height(), grid.width()));
    if grid.width() > REQUIRED_COLUMNS {
        log_info(format!("Ignoring {} columns after E", grid.width() - REQUIRED_COLUMNS));
    }

    log_info("⚙️  Remapping columns...");
    let result = transform_with_report(&grid);
    log_success(result.summary());
    print_failures(&result.failures);

    ConversionResult {
        source: SourceInfo {
            file_name: file_name.to_string(),
            kind: kind.label().to_string(),
            encoding,
            row_count: grid.height(),
            column_count: grid.width(),
        },
        table: OutputTable::new(result.records),
        failures: result.failures,
    }
}

fn print_failures(failures: &[FieldFailure]) {
    if failures.is_empty() {
        return;
    }

    log_warning(format!("{} fields left empty (unreadable values)", failures.len()));
    for failure in failures.iter().take(MAX_LOGGED_FAILURES) {
        log_warning_indent(
            format!("row {}: {} '{}'", failure.row + 1, failure.field, failure.value),
            1,
        );
    }
    if failures.len() > MAX_LOGGED_FAILURES {
        log_warning_indent(format!("... +{}", failures.len() - MAX_LOGGED_FAILURES), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;

    const LEDGER: &str = "D100,INV55,01/02/2024,\"1,000\",crn\n\
                          D200,INV56,not-a-date,abc,inv,extra\n";

    #[test]
    fn test_convert_end_to_end() {
        let table = convert(LEDGER.as_bytes(), "ledger.csv").unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].values(), ["D100", "CRD", "INV55", "01/02/2024", "1000.00"]);
        assert_eq!(table.records[1].values(), ["D200", "INV", "INV56", "", ""]);
    }

    #[test]
    fn test_process_bytes_reports_failures() {
        let result = process_bytes(LEDGER.as_bytes(), "ledger.csv").unwrap();

        assert_eq!(result.source.row_count, 2);
        assert_eq!(result.source.column_count, 6);
        assert_eq!(result.source.kind, "CSV");
        assert_eq!(result.date_failures(), 1);
        assert_eq!(result.balance_failures(), 1);
    }

    #[test]
    fn test_validation_errors_yield_no_output() {
        assert!(matches!(
            convert(b"a,b,c\n", "ledger.csv"),
            Err(IngestError::InsufficientColumns { found: 3 })
        ));
        assert!(matches!(convert(b"", "ledger.csv"), Err(IngestError::EmptyInput)));
        assert!(matches!(
            process_bytes(LEDGER.as_bytes(), "ledger.txt"),
            Err(PipelineError::Ingest(IngestError::UnsupportedFormat(_)))
        ));
    }

    #[test]
    fn test_download_artifact() {
        let result = process_bytes(LEDGER.as_bytes(), "ledger.csv").unwrap();
        let artifact = result.download().unwrap();

        assert_eq!(artifact.file_name, "tynic_upload.csv");
        let lines: Vec<&str> = artifact.content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "D100,CRD,INV55,01/02/2024,1000.00");
    }

    #[test]
    fn test_convert_file_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Ledger.CSV");
        let output = dir.path().join("out.csv");
        std::fs::write(&input, LEDGER).unwrap();

        let result = convert_file(&input, &output).unwrap();
        assert_eq!(result.source.file_name, "Ledger.CSV");

        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.starts_with("Debtor Reference,Transaction Type,"));
        assert!(written.contains("D200,INV,INV56,,\n"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = process_file("/nonexistent/ledger.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Ingest(IngestError::Io(_))));
    }
}
