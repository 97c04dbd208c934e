//! Error types for the Tynic conversion pipeline.
//!
//! - [`IngestError`] - Reading and validating the uploaded file
//! - [`ExportError`] - Writing the output CSV
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Per-cell date and balance failures are not errors: they degrade the
//! single field to an empty string and the row is still produced.
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Ingest Errors
// =============================================================================

/// Errors while turning raw upload bytes into an input grid.
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension is not `.csv`, `.xls` or `.xlsx`.
    #[error("Unsupported file format '{0}'. Please upload a CSV or Excel file.")]
    UnsupportedFormat(String),

    /// The parsed grid has no rows.
    #[error("The uploaded file is empty.")]
    EmptyInput,

    /// The parsed grid is narrower than columns A-E.
    #[error("Input file must have at least 5 columns (A-E), found {found}.")]
    InsufficientColumns { found: usize },

    /// The file content could not be read as its declared kind.
    #[error("Could not read file: {0}")]
    Malformed(String),

    /// Failed to read file from disk.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Whether this error is one of the request-level validation failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedFormat(_)
                | IngestError::EmptyInput
                | IngestError::InsufficientColumns { .. }
        )
    }
}

impl From<csv::Error> for IngestError {
    fn from(err: csv::Error) -> Self {
        IngestError::Malformed(err.to_string())
    }
}

impl From<calamine::Error> for IngestError {
    fn from(err: calamine::Error) -> Self {
        IngestError::Malformed(err.to_string())
    }
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing the output table.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer failure.
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialized bytes were not valid UTF-8.
    #[error("Output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Failed to write the artifact to disk.
    #[error("Failed to write file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::process_bytes`]
/// and [`crate::transform::pipeline::process_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading or validating the input failed.
    #[error("{0}")]
    Ingest(#[from] IngestError),

    /// Writing the output failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<IngestError> for ServerError {
    fn from(err: IngestError) -> Self {
        ServerError::Pipeline(PipelineError::Ingest(err))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let ingest_err = IngestError::EmptyInput;
        let pipeline_err: PipelineError = ingest_err.into();
        assert_eq!(pipeline_err.to_string(), "The uploaded file is empty.");

        let server_err: ServerError = IngestError::UnsupportedFormat("txt".into()).into();
        assert!(server_err.to_string().contains("'txt'"));
    }

    #[test]
    fn test_insufficient_columns_message() {
        let err = IngestError::InsufficientColumns { found: 3 };
        let msg = err.to_string();
        assert!(msg.contains("at least 5 columns (A-E)"));
        assert!(msg.contains("found 3"));
    }

    #[test]
    fn test_validation_classification() {
        assert!(IngestError::EmptyInput.is_validation());
        assert!(IngestError::InsufficientColumns { found: 1 }.is_validation());
        assert!(IngestError::UnsupportedFormat("pdf".into()).is_validation());
        assert!(!IngestError::Malformed("bad zip".into()).is_validation());
    }
}
