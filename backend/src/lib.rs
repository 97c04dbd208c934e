//! # Tynic - debtor ledger upload converter
//!
//! Tynic takes a debtor ledger export (CSV or Excel, no header row) and
//! remaps its first five columns into the five-column upload format:
//!
//! | Output column      | Source | Rule                                       |
//! |--------------------|--------|--------------------------------------------|
//! | Debtor Reference   | A      | copied verbatim                            |
//! | Transaction Type   | E      | uppercased, `CRN` replaced with `CRD`      |
//! | Document Number    | B      | copied verbatim                            |
//! | Document Date      | C      | normalized to `DD/MM/YYYY`, else empty     |
//! | Document Balance   | D      | two decimals, commas stripped, else empty  |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ CSV / XLSX  │────▶│   Parser    │────▶│  Transform  │────▶│  CSV export │
//! │   (bytes)   │     │ (validate)  │     │ (per field) │     │ (download)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! let table = tynic::convert(&bytes, "ledger.xlsx")?;
//! let csv = tynic::serialize(&table.records)?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, grids and output records
//! - [`parser`] - CSV and Excel parsing with shape validation
//! - [`transform`] - Field rules, row mapper and pipeline
//! - [`export`] - CSV download artifact
//! - [`api`] - HTTP API server

pub mod error;
pub mod models;

pub mod parser;

pub mod transform;

pub mod export;

pub mod api;

// =============================================================================
// Re-exports - Errors
// =============================================================================

pub use error::{ExportError, IngestError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, InputGrid, OutputRecord, OutputTable, OUTPUT_HEADERS, REQUIRED_COLUMNS};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{parse, parse_file, parse_with_metadata, FileKind, ParseResult};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    convert, convert_file, process_bytes, process_file, transform, transform_with_report,
    ConversionResult, FieldFailure, SourceInfo, TransformResult,
};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{download, serialize, Download, DOWNLOAD_FILE_NAME, DOWNLOAD_MIME};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server, ServerConfig};
}
