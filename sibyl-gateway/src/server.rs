//! HTTP surface of the gateway.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use sibyl_index::{NewChunk, RetrievedChunk, chunker::split_document};
use tracing::{error, info};

use crate::pipeline::PipelineError;
use crate::state::AppState;

/// Chat request from HTTP API
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub question: String,
}

/// Chat response for HTTP API
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub status: String,
    pub answer: String,
    pub context: Vec<RetrievedChunk>,
}

#[derive(Debug, Deserialize)]
pub struct ResetSessionParams {
    pub session_id: String,
}

/// Generic status/message response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// Service identification response
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub app_name: String,
    pub app_version: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub detail: String,
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/rag", get(info_handler))
        .route("/api/rag/chat", post(chat_handler))
        .route("/api/rag/reset_session", post(reset_session_handler))
        .route("/api/rag/upload", post(upload_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Service identification - GET /api/rag
async fn info_handler() -> impl IntoResponse {
    Json(InfoResponse {
        app_name: env!("CARGO_PKG_NAME").to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn pipeline_error_response(err: PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        PipelineError::InvalidRequest(detail) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                status: "error".to_string(),
                detail: detail.to_string(),
            }),
        ),
        other => {
            // Upstream details stay in the logs, not in the response body.
            error!("chat pipeline failed: {}", other);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    detail: "chat request failed".to_string(),
                }),
            )
        }
    }
}

/// Chat handler - POST /api/rag/chat
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    match state
        .pipeline
        .chat(&request.session_id, &request.question)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChatResponse {
                status: "ok".to_string(),
                answer: outcome.answer,
                context: outcome.context,
            }),
        )
            .into_response(),
        Err(e) => pipeline_error_response(e).into_response(),
    }
}

/// Session reset handler - POST /api/rag/reset_session
///
/// Idempotent: resetting an unknown session succeeds with the same message.
async fn reset_session_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResetSessionParams>,
) -> impl IntoResponse {
    state.pipeline.reset_session(&params.session_id);
    info!("Cleared session history for '{}'", params.session_id);

    Json(StatusResponse {
        status: "ok".to_string(),
        message: format!("Cleared history for {}", params.session_id),
    })
}

/// Document upload handler - POST /api/rag/upload
///
/// Accepts multipart file fields, splits each text file into chunks, and
/// indexes them. Non-UTF-8 payloads are rejected rather than indexed as
/// garbage.
async fn upload_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let chunk_size = state.settings.index.chunk_size;
    let chunk_overlap = state.settings.index.chunk_overlap;

    let mut chunks: Vec<NewChunk> = Vec::new();
    let mut files = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        status: "error".to_string(),
                        detail: format!("invalid multipart payload: {}", e),
                    }),
                )
                    .into_response();
            }
        };

        let Some(file_name) = field.file_name().map(str::to_string) else {
            // Skip non-file form fields.
            continue;
        };

        let text = match field.text().await {
            Ok(text) => text,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse {
                        status: "error".to_string(),
                        detail: format!("file '{}' is not valid UTF-8 text: {}", file_name, e),
                    }),
                )
                    .into_response();
            }
        };

        files += 1;
        chunks.extend(split_document(&file_name, &text, chunk_size, chunk_overlap));
    }

    if files == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                status: "error".to_string(),
                detail: "no files in upload".to_string(),
            }),
        )
            .into_response();
    }

    match state.pipeline.store().add(&chunks).await {
        Ok(added) => {
            info!("Indexed {} chunks from {} uploaded files", added, files);
            (
                StatusCode::OK,
                Json(StatusResponse {
                    status: "ok".to_string(),
                    message: format!("Indexed {} chunks from {} files", added, files),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("upload indexing failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    detail: "failed to index uploaded documents".to_string(),
                }),
            )
                .into_response()
        }
    }
}
