//! JSON HTTP server.
//!
//! Exposes the document-QA pipeline over HTTP for frontends and scripts.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/status` | Staged files and snapshot metadata |
//! | `POST` | `/upload` | Stage base64-encoded files |
//! | `POST` | `/build`  | Rebuild the index snapshot |
//! | `POST` | `/ask`    | Ask a question over the indexed documents |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "not_ready", "message": "no index snapshot found ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `empty_document_set` (400),
//! `not_ready` (409), `dimension_mismatch` (409), `index_build` (500),
//! `embedding` (502), `generation` (502), `internal` (500).
//!
//! # Concurrency
//!
//! Build and ask requests are serialized through a single async lock so a
//! query never observes a snapshot mid-replacement and two builds never
//! race on the temp file.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::error::QaError;
use crate::index;
use crate::models::SkippedFile;
use crate::pipeline::Pipeline;
use crate::staging;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    /// Serializes build and ask flows.
    flow_lock: Arc<tokio::sync::Mutex<()>>,
}

/// Starts the HTTP server on the configured bind address.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config.clone())?;
    run_server_with_pipeline(&config.server.bind, Arc::new(pipeline)).await
}

/// Starts the server with an already-constructed pipeline. Lets callers
/// inject alternative embedding or generation backends.
pub async fn run_server_with_pipeline(
    bind_addr: &str,
    pipeline: Arc<Pipeline>,
) -> anyhow::Result<()> {
    let state = AppState {
        pipeline,
        flow_lock: Arc::new(tokio::sync::Mutex::new(())),
    };

    let app = router(state);

    println!("docqa server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/status", get(handle_status))
        .route("/upload", post(handle_upload))
        .route("/build", post(handle_build))
        .route("/ask", post(handle_ask))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        let message = err.to_string();
        let (status, code) = match err {
            QaError::EmptyDocumentSet => (StatusCode::BAD_REQUEST, "empty_document_set"),
            QaError::IndexNotFound(_) => (StatusCode::CONFLICT, "not_ready"),
            QaError::DimensionMismatch { .. } => (StatusCode::CONFLICT, "dimension_mismatch"),
            QaError::IndexBuild(_) => (StatusCode::INTERNAL_SERVER_ERROR, "index_build"),
            QaError::Embedding(_) => (StatusCode::BAD_GATEWAY, "embedding"),
            QaError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation"),
        };
        AppError {
            status,
            code,
            message,
        }
    }
}

// ============ GET /health ============

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

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    staged_files: Vec<StagedFileInfo>,
    snapshot: Option<SnapshotStatus>,
}

#[derive(Serialize)]
struct StagedFileInfo {
    name: String,
    bytes: u64,
}

#[derive(Serialize)]
struct SnapshotStatus {
    model: String,
    dims: usize,
    entries: i64,
    created_at: String,
}

async fn handle_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let config = state.pipeline.config();

    let staged = staging::list_staged(&config.staging.dir)
        .map_err(|e| internal(e.to_string()))?
        .into_iter()
        .map(|f| StagedFileInfo {
            name: f.name,
            bytes: f.bytes,
        })
        .collect();

    let snapshot = index::snapshot_info(&state.pipeline.snapshot_path())
        .await?
        .map(|info| SnapshotStatus {
            model: info.model,
            dims: info.dims,
            entries: info.entries,
            created_at: info.created_at,
        });

    Ok(Json(StatusResponse {
        staged_files: staged,
        snapshot,
    }))
}

// ============ POST /upload ============

#[derive(Deserialize)]
struct UploadRequest {
    files: Vec<UploadFile>,
}

#[derive(Deserialize)]
struct UploadFile {
    name: String,
    content_base64: String,
}

#[derive(Serialize)]
struct UploadResponse {
    staged: usize,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    if request.files.is_empty() {
        return Err(bad_request("files must not be empty"));
    }

    let staging_dir = &state.pipeline.config().staging.dir;
    let mut staged = 0usize;

    for file in &request.files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&file.content_base64)
            .map_err(|e| bad_request(format!("{}: invalid base64 content: {}", file.name, e)))?;
        staging::stage_bytes(staging_dir, &file.name, &bytes)
            .map_err(|e| bad_request(e.to_string()))?;
        staged += 1;
    }

    Ok(Json(UploadResponse { staged }))
}

// ============ POST /build ============

#[derive(Serialize)]
struct BuildResponse {
    documents: usize,
    chunks: usize,
    skipped: Vec<SkippedFileInfo>,
}

#[derive(Serialize)]
struct SkippedFileInfo {
    filename: String,
    reason: String,
}

impl From<SkippedFile> for SkippedFileInfo {
    fn from(s: SkippedFile) -> Self {
        Self {
            filename: s.filename,
            reason: s.reason,
        }
    }
}

async fn handle_build(State(state): State<AppState>) -> Result<Json<BuildResponse>, AppError> {
    let _guard = state.flow_lock.lock().await;

    let report = state.pipeline.build_index().await?;
    Ok(Json(BuildResponse {
        documents: report.documents,
        chunks: report.chunks,
        skipped: report.skipped.into_iter().map(Into::into).collect(),
    }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    top_k: Option<usize>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    sources: Vec<SourceInfo>,
}

#[derive(Serialize)]
struct SourceInfo {
    source: String,
    score: f32,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let top_k = request
        .top_k
        .unwrap_or(state.pipeline.config().retrieval.top_k)
        .max(1);

    let _guard = state.flow_lock.lock().await;

    let answer = state.pipeline.answer(question, top_k).await?;
    Ok(Json(AskResponse {
        answer: answer.text,
        sources: answer
            .sources
            .into_iter()
            .map(|hit| SourceInfo {
                source: hit.source,
                score: hit.score,
            })
            .collect(),
    }))
}
