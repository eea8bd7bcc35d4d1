//! JSON HTTP API server.
//!
//! Exposes the ingestion and question-answering pipelines over HTTP for
//! doc portals and other clients.
//!
//! # Endpoints
//!
//! | Method   | Path            | Description                          |
//! |----------|-----------------|--------------------------------------|
//! | `POST`   | `/ingest`       | Ingest documentation files           |
//! | `POST`   | `/qa`           | Ask a question over ingested docs    |
//! | `GET`    | `/docs`         | List stored documents                |
//! | `DELETE` | `/docs/{id}`    | Delete a document and its chunks     |
//! | `GET`    | `/history`      | List recent QA interactions          |
//! | `GET`    | `/history/{id}` | Fetch one QA interaction             |
//! | `GET`    | `/health`       | Health check (returns version)       |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid id" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//! Provider degradations (embedding, generation) never surface here; the
//! pipelines substitute fallbacks and answer anyway.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based doc
//! portals can call the API directly.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::app::App;
use crate::config::Config;
use crate::ingest::{self, InvalidFile};
use crate::models::{DocumentInfo, HistoryItem, IngestFile, IngestSummary, QaRecord};
use crate::{docs, qa};

/// Shared application state passed to all route handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
struct AppState {
    app: Arc<App>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and runs until the
/// process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = Arc::new(App::assemble(config.clone()).await?);
    let router = build_router(app);

    println!("Docwell API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Assembles the router. Separate from [`run_server`] so tests can drive
/// the API over an ephemeral listener.
pub fn build_router(app: Arc<App>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/qa", post(handle_qa))
        .route("/docs", get(handle_list_docs))
        .route("/docs/{id}", delete(handle_delete_doc))
        .route("/history", get(handle_list_history))
        .route("/history/{id}", get(handle_get_history))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { app })
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable
/// message.
#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Strict-detection rejections are client errors; everything else from the
/// ingestion pipeline is internal.
fn classify_ingest_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<InvalidFile>() {
        Some(invalid) => bad_request(invalid.to_string()),
        None => internal(err.to_string()),
    }
}

// ============ POST /ingest ============

/// JSON request body for `POST /ingest`.
#[derive(Deserialize)]
struct IngestRequest {
    files: Vec<IngestFile>,
}

/// Handler for `POST /ingest`.
///
/// Ingests every file in the request and returns the created document ids
/// and the total chunk count.
async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestSummary>, AppError> {
    if req.files.is_empty() {
        return Err(bad_request("no files provided"));
    }
    let app = &state.app;
    let summary = ingest::ingest_files(
        &app.store,
        &app.embedder,
        &app.index,
        &app.config.ingest,
        &req.files,
    )
    .await
    .map_err(classify_ingest_error)?;
    Ok(Json(summary))
}

// ============ POST /qa ============

/// JSON request body for `POST /qa`.
#[derive(Deserialize)]
struct QaRequest {
    question: String,
}

/// Handler for `POST /qa`.
///
/// Runs the QA pipeline and returns the full record: answer, citations,
/// snippets, and (for persisted answers) its history id.
async fn handle_qa(
    State(state): State<AppState>,
    Json(req): Json<QaRequest>,
) -> Result<Json<QaRecord>, AppError> {
    let app = &state.app;
    let record = qa::ask(
        &app.store,
        &app.embedder,
        &app.index,
        app.generator.as_ref(),
        &req.question,
    )
    .await
    .map_err(|e| internal(e.to_string()))?;
    Ok(Json(record))
}

// ============ GET /docs ============

/// Handler for `GET /docs`. Lists stored documents, oldest first.
async fn handle_list_docs(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentInfo>>, AppError> {
    let docs = docs::list_documents(&state.app.store)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(docs))
}

// ============ DELETE /docs/{id} ============

/// JSON response body for `DELETE /docs/{id}`.
#[derive(Serialize)]
struct DeleteResponse {
    status: String,
    id: String,
}

/// Handler for `DELETE /docs/{id}`.
///
/// Returns `400` for a malformed id, `404` for an unknown one. Deletion
/// cascades to chunks and index entries.
async fn handle_delete_doc(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if Uuid::parse_str(&id).is_err() {
        return Err(bad_request("invalid id"));
    }
    let app = &state.app;
    let deleted = docs::remove_document(&app.store, &app.index, &id)
        .await
        .map_err(|e| internal(e.to_string()))?;
    if !deleted {
        return Err(not_found("not found"));
    }
    Ok(Json(DeleteResponse {
        status: "deleted".to_string(),
        id,
    }))
}

// ============ GET /history ============

/// Query parameters for `GET /history`.
#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<i64>,
}

/// Handler for `GET /history`.
///
/// Most recent interactions first, capped at 50 entries.
async fn handle_list_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryItem>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 50);
    let items = state
        .app
        .store
        .recent_history(limit)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(items))
}

// ============ GET /history/{id} ============

/// Handler for `GET /history/{id}`.
///
/// Returns `400` for a malformed id, `404` for an unknown one.
async fn handle_get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QaRecord>, AppError> {
    if Uuid::parse_str(&id).is_err() {
        return Err(bad_request("invalid id"));
    }
    let record = state
        .app
        .store
        .history_by_id(&id)
        .await
        .map_err(|e| internal(e.to_string()))?;
    match record {
        Some(record) => Ok(Json(record)),
        None => Err(not_found("not found")),
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
