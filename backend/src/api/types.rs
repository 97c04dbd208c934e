//! REST API types for the upload preview.
//!
//! Records are keyed by their output header names, so the frontend can
//! render the preview table straight from `columns` and `records`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::export::{DOWNLOAD_FILE_NAME, DOWNLOAD_MIME};
use crate::models::OutputRecord;
use crate::transform::mapper::FieldFailure;
use crate::transform::pipeline::ConversionResult;

/// Number of field failures echoed back in a response
const MAX_REPORTED_FAILURES: usize = 20;

/// Response sent after a successful upload and conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Correlation id for this conversion, repeated in its log line.
    /// Nothing is stored under it; `/api/convert` takes the file again.
    pub job_id: String,

    /// Status: "ready" or "warning" (some fields left empty)
    pub status: String,

    /// Output headers, in order
    pub columns: Vec<String>,

    /// Converted records
    pub records: Vec<OutputRecord>,

    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    pub row_count: usize,
    pub source: SourceMetadata,
    pub field_failures: FailureStats,
    pub download: DownloadInfo,
}

/// Uploaded file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub file_name: String,
    pub kind: String,
    pub encoding: Option<String>,
    pub column_count: usize,
}

/// Counts of fields that degraded to empty
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureStats {
    pub dates: usize,
    pub balances: usize,
    /// First few failures, 1-based row numbers
    pub samples: Vec<FailureSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSample {
    pub row: usize,
    pub field: String,
    pub value: String,
}

impl From<&FieldFailure> for FailureSample {
    fn from(failure: &FieldFailure) -> Self {
        Self {
            row: failure.row + 1,
            field: failure.field.to_string(),
            value: failure.value.clone(),
        }
    }
}

/// Where to fetch the CSV artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub file_name: String,
    pub mime_type: String,
    pub endpoint: String,
}

impl Default for DownloadInfo {
    fn default() -> Self {
        Self {
            file_name: DOWNLOAD_FILE_NAME.to_string(),
            mime_type: DOWNLOAD_MIME.to_string(),
            endpoint: "POST /api/convert".to_string(),
        }
    }
}

impl From<ConversionResult> for UploadResponse {
    fn from(result: ConversionResult) -> Self {
        let field_failures = FailureStats {
            dates: result.date_failures(),
            balances: result.balance_failures(),
            samples: result
                .failures
                .iter()
                .take(MAX_REPORTED_FAILURES)
                .map(FailureSample::from)
                .collect(),
        };

        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: if result.failures.is_empty() { "ready" } else { "warning" }.to_string(),
            metadata: ResponseMetadata {
                row_count: result.table.len(),
                source: SourceMetadata {
                    file_name: result.source.file_name,
                    kind: result.source.kind,
                    encoding: result.source.encoding,
                    column_count: result.source.column_count,
                },
                field_failures,
                download: DownloadInfo::default(),
            },
            columns: result.table.columns,
            records: result.table.records,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "columns": [],
        "records": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::pipeline::process_bytes;

    #[test]
    fn test_response_from_conversion() {
        let csv = "D1,N1,2024-03-05,10,crn\nD2,N2,soon,1,inv\n";
        let result = process_bytes(csv.as_bytes(), "ledger.csv").unwrap();
        let response = UploadResponse::from(result);

        assert_eq!(response.status, "warning");
        assert_eq!(response.columns[1], "Transaction Type");
        assert_eq!(response.metadata.row_count, 2);
        assert_eq!(response.metadata.field_failures.dates, 1);
        assert_eq!(response.metadata.field_failures.samples[0].row, 2);
        assert_eq!(response.metadata.download.file_name, "tynic_upload.csv");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["records"][0]["Document Date"], "05/03/2024");
        assert_eq!(json["metadata"]["source"]["kind"], "CSV");
    }

    #[test]
    fn test_error_response_has_no_records() {
        let body = error_response("The uploaded file is empty.");
        assert_eq!(body["status"], "error");
        assert_eq!(body["records"].as_array().unwrap().len(), 0);
    }
}
