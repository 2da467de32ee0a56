//! HTTP server.
//!
//! Exposes the [`Session`] over a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Service banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/modes` | Available response modes |
//! | `POST` | `/upload-pdf` | Upload a PDF (multipart `file` part) and index it |
//! | `POST` | `/ask` | Ask a question about the current PDF |
//! | `GET`  | `/history` | Questions answered since the last upload |
//! | `DELETE` | `/history` | Clear the history |
//! | `GET`  | `/status` | Session status |
//!
//! `/upload-pdf` also accepts the raw PDF as the request body with the
//! name in `?filename=<name>`.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "no_index", "message": "no document has been uploaded yet; upload a PDF first" } }
//! ```
//!
//! `unsupported_format`, `invalid_mode` and `no_index` are 400,
//! `extraction_failed` is 422, everything else is 500. Malformed requests
//! (bad JSON, missing query parameters, broken multipart bodies) use the
//! same body with code `invalid_request` and the extractor's status.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! can be served from anywhere.

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{BytesRejection, JsonRejection, QueryRejection},
        DefaultBodyLimit, FromRequest, Multipart, Query, Request, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use pdfqa_core::modes::Mode;
use pdfqa_core::QaError;

use crate::config::Config;
use crate::extract::{is_pdf_filename, validate_pdf};
use crate::session::{QaRecord, Session, SessionStatus};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Session>,
    pub upload_dir: Arc<PathBuf>,
}

/// Build the router. Exposed separately from [`run_server`] so it can be
/// driven in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/modes", get(handle_modes))
        .route(
            "/upload-pdf",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/ask", post(handle_ask))
        .route("/history", get(handle_history).delete(handle_clear_history))
        .route("/status", get(handle_status))
        .layer(cors)
        .with_state(state)
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config, session: Arc<Session>) -> anyhow::Result<()> {
    let state = AppState {
        session,
        upload_dir: Arc::new(config.server.upload_dir.clone()),
    };
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        let status = match &err {
            QaError::UnsupportedFormat(_) | QaError::InvalidMode { .. } | QaError::NoIndex => {
                StatusCode::BAD_REQUEST
            }
            QaError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            QaError::Io(_) | QaError::Embedding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl AppError {
    fn invalid_request(status: StatusCode, message: String) -> Self {
        AppError {
            status,
            code: "invalid_request".to_string(),
            message,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::invalid_request(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::invalid_request(rejection.status(), rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        AppError::invalid_request(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::invalid_request(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::invalid_request(err.status(), err.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "request failed");
        } else {
            tracing::warn!(code = %self.code, message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ GET / and /health ============

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
}

async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Educational Content Assistant API",
        status: "running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /modes ============

#[derive(Serialize)]
struct ModesResponse {
    modes: Vec<&'static str>,
}

async fn handle_modes(State(state): State<AppState>) -> Json<ModesResponse> {
    Json(ModesResponse {
        modes: state.session.list_modes(),
    })
}

// ============ POST /upload-pdf ============

#[derive(Deserialize)]
struct UploadParams {
    filename: String,
}

#[derive(Serialize)]
struct UploadResponse {
    status: &'static str,
    filename: String,
    pages: usize,
    chunks: usize,
    message: &'static str,
}

/// Handler for `POST /upload-pdf`.
///
/// Takes either a `multipart/form-data` body with a `file` part (the name
/// comes from the part) or the raw PDF with `?filename=<name>`. Only the
/// basename is used. The upload is checked to be a PDF before it is saved
/// to the upload directory, then extracted and indexed; on success it
/// replaces the current document and clears the history.
async fn handle_upload(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<UploadResponse>, AppError> {
    let (raw_name, body) = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &()).await?;
        read_file_part(multipart).await?
    } else {
        let Query(params) = Query::<UploadParams>::try_from_uri(request.uri())?;
        let body = Bytes::from_request(request, &()).await?;
        (params.filename, body)
    };

    let filename = Path::new(&raw_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_pdf_filename(&filename) {
        return Err(QaError::UnsupportedFormat("Only PDF files are allowed".to_string()).into());
    }
    validate_pdf(&filename, &body)?;

    tokio::fs::create_dir_all(state.upload_dir.as_path())
        .await
        .map_err(QaError::from)?;
    let path = state.upload_dir.join(&filename);
    tokio::fs::write(&path, &body).await.map_err(QaError::from)?;
    tracing::info!(path = %path.display(), bytes = body.len(), "upload saved");

    let summary = state.session.ingest_bytes(&filename, &body).await?;

    Ok(Json(UploadResponse {
        status: "uploaded",
        filename: summary.filename,
        pages: summary.page_count,
        chunks: summary.chunk_count,
        message: "PDF processed successfully",
    }))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Name and contents of the `file` part; other parts are skipped.
async fn read_file_part(mut multipart: Multipart) -> Result<(String, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        return Ok((filename, data));
    }
    Err(AppError::invalid_request(
        StatusCode::BAD_REQUEST,
        "multipart body has no `file` part".to_string(),
    ))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    #[serde(default = "default_mode")]
    mode: String,
}

fn default_mode() -> String {
    Mode::Default.as_str().to_string()
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    mode: Mode,
    /// Number of retrieved sources.
    sources: usize,
}

async fn handle_ask(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, AppError> {
    let Json(req) = payload?;
    let answer = state.session.ask(&req.question, &req.mode).await?;
    Ok(Json(AskResponse {
        answer: answer.answer,
        mode: answer.mode,
        sources: answer.sources.len(),
    }))
}

// ============ /history ============

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<QaRecord>,
    pdf: Option<String>,
    total: usize,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let history = state.session.history().await;
    Json(HistoryResponse {
        total: history.len(),
        history,
        pdf: state.session.current_pdf().await,
    })
}

async fn handle_clear_history(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.session.clear_history().await;
    Json(serde_json::json!({ "status": "history cleared" }))
}

// ============ GET /status ============

async fn handle_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.session.status().await)
}
