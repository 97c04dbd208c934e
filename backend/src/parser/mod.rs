//! Upload parser: CSV and Excel files into a header-less [`InputGrid`].
//!
//! The file kind comes from the file name's extension. CSV bytes go through
//! encoding auto-detection before parsing; spreadsheets are read with
//! `calamine` (first sheet only). Both paths finish with the same shape
//! validation: at least one row and at least five columns.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Cursor;
use std::path::Path;

use crate::error::{IngestError, IngestResult};
use crate::models::{Cell, InputGrid, REQUIRED_COLUMNS};

/// Kind of uploaded file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Comma-separated text
    Csv,
    /// `.xls` or `.xlsx` workbook
    Spreadsheet,
}

impl FileKind {
    /// Dispatch on the final extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> IngestResult<Self> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileKind::Csv),
            "xls" | "xlsx" => Ok(FileKind::Spreadsheet),
            _ => Err(IngestError::UnsupportedFormat(file_name.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Csv => "CSV",
            FileKind::Spreadsheet => "Excel",
        }
    }
}

/// Result of parsing with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// The parsed grid
    pub grid: InputGrid,
    /// Declared kind of the file
    pub kind: FileKind,
    /// Detected text encoding (CSV only)
    pub encoding: Option<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to a string using the specified encoding.
///
/// Unknown encodings fall back to lossy UTF-8. A leading BOM is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).into_owned(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match decoded.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => decoded,
    }
}

/// Parse comma-separated text with no header row.
///
/// Values are kept verbatim as strings; ragged rows are allowed and blank
/// lines are skipped.
pub fn parse_csv_grid(content: &str) -> IngestResult<InputGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from).collect());
    }

    Ok(InputGrid::from_rows(rows))
}

/// Parse the first sheet of an `.xls` or `.xlsx` workbook with no header row.
pub fn parse_spreadsheet_grid(bytes: &[u8]) -> IngestResult<InputGrid> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IngestError::Malformed("workbook has no sheets".to_string()))??;

    // Ranges start at the first used cell; pad so index 0 is always column A
    let col_offset = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(cell_from_data));
            cells
        })
        .collect();

    Ok(InputGrid::from_rows(rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::String(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Float(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::String(s.clone())),
        Data::DurationIso(s) => Cell::String(s.clone()),
        Data::Error(e) => Cell::String(e.to_string()),
    }
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    s.parse::<NaiveDateTime>()
        .ok()
        .or_else(|| s.parse::<NaiveDate>().ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Check the grid has rows and reaches column E.
pub fn validate_grid(grid: &InputGrid) -> IngestResult<()> {
    if grid.is_empty() {
        return Err(IngestError::EmptyInput);
    }
    if grid.width() < REQUIRED_COLUMNS {
        return Err(IngestError::InsufficientColumns {
            found: grid.width(),
        });
    }
    Ok(())
}

/// Parse upload bytes, dispatching on the file name, and validate the shape.
pub fn parse_with_metadata(bytes: &[u8], file_name: &str) -> IngestResult<ParseResult> {
    let kind = FileKind::from_file_name(file_name)?;

    let (grid, encoding) = match kind {
        FileKind::Csv => {
            let encoding = detect_encoding(bytes);
            let content = decode_content(bytes, &encoding);
            (parse_csv_grid(&content)?, Some(encoding))
        }
        FileKind::Spreadsheet => (parse_spreadsheet_grid(bytes)?, None),
    };

    validate_grid(&grid)?;

    Ok(ParseResult {
        grid,
        kind,
        encoding,
    })
}

/// Parse upload bytes into a validated grid.
///
/// # Example
/// ```ignore
/// let grid = tynic::parse(b"D1,INV1,01/02/2024,10,inv\n", "ledger.csv")?;
/// assert_eq!(grid.height(), 1);
/// ```
pub fn parse(bytes: &[u8], file_name: &str) -> IngestResult<InputGrid> {
    parse_with_metadata(bytes, file_name).map(|result| result.grid)
}

/// Parse a file from disk; the path's file name selects the format.
pub fn parse_file<P: AsRef<Path>>(path: P) -> IngestResult<ParseResult> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Reject before touching the disk
    FileKind::from_file_name(&file_name)?;

    let bytes = std::fs::read(path)?;
    parse_with_metadata(&bytes, &file_name)
}
