//! HTTP Server for the Tynic converter.
//!
//! # API Endpoints
//!
//! | Method | Path           | Description                               |
//! |--------|----------------|-------------------------------------------|
//! | GET    | `/health`      | Health check                              |
//! | POST   | `/api/upload`  | Upload a file, get the converted preview  |
//! | POST   | `/api/convert` | Upload a file, get `tynic_upload.csv`     |
//! | GET    | `/api/logs`    | SSE stream for real-time logs             |
//!
//! Both POST endpoints take a multipart form with a `file` field; the
//! field's file name selects CSV or Excel parsing.

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::error::{IngestError, PipelineError, ServerError, ServerResult};
use crate::export::{Download, DOWNLOAD_FILE_NAME};
use crate::transform::pipeline::process_bytes;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server settings, read from the environment (after `.env` is loaded).
///
/// | Variable                  | Default   |
/// |---------------------------|-----------|
/// | `TYNIC_HOST`              | `0.0.0.0` |
/// | `TYNIC_PORT`              | `3000`    |
/// | `TYNIC_MAX_UPLOAD_BYTES`  | 20 MiB    |
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable values keep their default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("TYNIC_HOST").unwrap_or(defaults.host),
            port: lookup("TYNIC_PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            max_upload_bytes: lookup("TYNIC_MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
        }
    }

    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(PipelineError::Ingest(err)) => match err {
                IngestError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                IngestError::EmptyInput | IngestError::InsufficientColumns { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                IngestError::Malformed(_) => StatusCode::BAD_REQUEST,
                IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Pipeline(PipelineError::Export(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(err: ServerError) -> ApiError {
    log_error(err.to_string());
    (err.status_code(), Json(error_response(&err.to_string())))
}

/// Build the application router.
pub fn router(config: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/convert", post(convert))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(&config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    eprintln!("🚀 Tynic converter running on http://{}", addr);
    eprintln!("   POST /api/upload  - Upload file, preview converted table");
    eprintln!("   POST /api/convert - Upload file, download {}", DOWNLOAD_FILE_NAME);
    eprintln!("   GET  /api/logs    - SSE log stream");
    eprintln!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "tynic",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "convert": "POST /api/convert",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Pull the `file` field out of a multipart form.
async fn read_file_field(mut multipart: Multipart) -> ServerResult<(String, Vec<u8>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ServerError::BadRequest("File name is required".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;

        return Ok((file_name, bytes.to_vec()));
    }

    Err(ServerError::BadRequest("No file provided".to_string()))
}

/// Convert an upload into the preview response.
pub fn upload_response(file_name: &str, bytes: &[u8]) -> ServerResult<UploadResponse> {
    let result = process_bytes(bytes, file_name)?;
    let response = UploadResponse::from(result);
    log_info(format!(
        "🔖 Job {}: {} records ready for preview",
        response.job_id, response.metadata.row_count
    ));
    Ok(response)
}

/// Convert an upload into the CSV artifact.
pub fn convert_response(file_name: &str, bytes: &[u8]) -> ServerResult<Download> {
    let result = process_bytes(bytes, file_name)?;
    Ok(result.download()?)
}

/// Upload endpoint: JSON preview of the converted table
async fn upload(multipart: Multipart) -> Result<Json<UploadResponse>, ApiError> {
    let (file_name, bytes) = read_file_field(multipart).await.map_err(api_error)?;
    upload_response(&file_name, &bytes).map(Json).map_err(api_error)
}

/// Convert endpoint: the CSV file itself, as an attachment
async fn convert(multipart: Multipart) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = read_file_field(multipart).await.map_err(api_error)?;
    let artifact = convert_response(&file_name, &bytes).map_err(api_error)?;

    let disposition = format!("attachment; filename=\"{}\"", artifact.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, artifact.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.content,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const LEDGER: &[u8] = b"D100,INV55,01/02/2024,\"1,000\",crn\n";

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::from_lookup(|_| None);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("TYNIC_HOST", "127.0.0.1"),
            ("TYNIC_PORT", "8080"),
            ("TYNIC_MAX_UPLOAD_BYTES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = ServerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);

        let config = config.with_port(Some(9000));
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_status_codes() {
        let unsupported: ServerError = IngestError::UnsupportedFormat("a.txt".into()).into();
        assert_eq!(unsupported.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let empty: ServerError = IngestError::EmptyInput.into();
        assert_eq!(empty.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let narrow: ServerError = IngestError::InsufficientColumns { found: 3 }.into();
        assert_eq!(narrow.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad = ServerError::BadRequest("No file provided".into());
        assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_response() {
        let response = upload_response("ledger.csv", LEDGER).unwrap();
        assert_eq!(response.status, "ready");
        assert_eq!(response.records[0].transaction_type, "CRD");
    }

    #[test]
    fn test_upload_job_id_is_logged() {
        let mut rx = LOG_BROADCASTER.subscribe();
        let response = upload_response("ledger.csv", LEDGER).unwrap();

        let mut logged = false;
        loop {
            match rx.try_recv() {
                Ok(entry) => logged |= entry.message.contains(&response.job_id),
                Err(tokio::sync::broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        assert!(logged);
    }

    #[test]
    fn test_convert_response() {
        let artifact = convert_response("ledger.csv", LEDGER).unwrap();
        assert_eq!(artifact.mime_type, "text/csv");
        assert!(artifact.content.ends_with("D100,CRD,INV55,01/02/2024,1000.00\n"));
    }

    #[test]
    fn test_rejected_upload() {
        let err = upload_response("ledger.txt", LEDGER).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let (status, Json(body)) = api_error(err);
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["status"], "error");
    }

    #[test]
    fn test_router_builds() {
        let _ = router(&ServerConfig::default());
    }
}
