//! HTTP service shell.
//!
//! Exposes the engine's boundary operations over a small JSON API. All
//! behavior lives in [`QaEngine`]; the handlers only adapt requests and
//! classify errors.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/process` | Ingest the documents directory |
//! | `POST` | `/query` | Answer a question from the indexed corpus |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses use the body shape:
//!
//! ```json
//! { "error": { "code": "empty_corpus", "message": "no documents found to process" } }
//! ```
//!
//! Codes: `bad_request` (400), `empty_corpus` (400), `timeout` (408),
//! `service_unavailable` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::{IngestError, QaEngine};
use crate::index::IndexError;
use crate::service::ServiceError;

/// Start the HTTP server on the configured bind address.
///
/// The engine is shared across handlers; it holds the only index this
/// process will ever have, so the server runs until terminated.
pub async fn run_server(engine: Arc<QaEngine>) -> anyhow::Result<()> {
    let bind_addr = engine.config().server.bind.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/process", post(handle_process))
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(engine);

    println!("docqa listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"empty_corpus"`).
    code: String,
    /// Human-readable error message.
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

/// Map an operation failure onto the error contract by inspecting the
/// typed error kinds the pipeline produces.
fn classify_error(err: anyhow::Error) -> AppError {
    if let Some(ingest) = err.downcast_ref::<IngestError>() {
        return AppError {
            status: StatusCode::BAD_REQUEST,
            code: "empty_corpus",
            message: ingest.to_string(),
        };
    }

    if let Some(service) = err.downcast_ref::<ServiceError>() {
        return match service {
            ServiceError::Timeout { .. } => AppError {
                status: StatusCode::REQUEST_TIMEOUT,
                code: "timeout",
                message: service.to_string(),
            },
            _ => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "service_unavailable",
                message: service.to_string(),
            },
        };
    }

    if let Some(index) = err.downcast_ref::<IndexError>() {
        return AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal",
            message: index.to_string(),
        };
    }

    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: format!("{:#}", err),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    indexed_chunks: usize,
}

async fn handle_health(State(engine): State<Arc<QaEngine>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        indexed_chunks: engine.index_size(),
    })
}

// ============ POST /process ============

#[derive(Serialize)]
struct ProcessResponse {
    message: String,
    documents_processed: usize,
    documents_skipped: usize,
    total_chunks_stored: usize,
}

/// Ingest everything in the documents directory.
///
/// Repeating the call re-processes the same files and appends their
/// chunks again; the index has no replace semantics.
async fn handle_process(
    State(engine): State<Arc<QaEngine>>,
) -> Result<Json<ProcessResponse>, AppError> {
    let report = engine.ingest().await.map_err(classify_error)?;

    Ok(Json(ProcessResponse {
        message: "documents processed successfully".to_string(),
        documents_processed: report.documents_processed,
        documents_skipped: report.documents_skipped,
        total_chunks_stored: report.chunks_indexed,
    }))
}

// ============ POST /query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Serialize)]
struct QueryResponse {
    response: String,
    sources: Vec<String>,
}

async fn handle_query(
    State(engine): State<Arc<QaEngine>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: "query must not be empty".to_string(),
        });
    }

    let answer = engine
        .answer(&request.query)
        .await
        .map_err(classify_error)?;

    Ok(Json(QueryResponse {
        response: answer.response,
        sources: answer.sources,
    }))
}
