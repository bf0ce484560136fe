//! HTTP shell for the Concierge answer pipeline.
//!
//! Exposes `POST /chat` and `POST /embed` (plus `GET /health`) over an
//! `axum` router. The handlers are thin: request bodies are parsed
//! leniently, handed to [`AnswerPipeline`], and pipeline errors are
//! mapped onto the HTTP status contract. Non-POST requests to the two
//! endpoints get 405 from the method routing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use concierge_rag::{AnswerPipeline, Document, RagError};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The answer and ingestion pipeline.
    pub pipeline: Arc<AnswerPipeline>,
}

/// Bind address configuration for the server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8788 }
    }
}

/// Build the application router.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/embed", post(embed))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Bind and serve until the process is stopped.
pub async fn run_server(config: ServerConfig, pipeline: Arc<AnswerPipeline>) -> anyhow::Result<()> {
    let app = app_router(AppState { pipeline });
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for concierge-server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("concierge-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "concierge-server" }))
}

/// `POST /chat` — answer a question.
///
/// The body is parsed leniently; an unreadable body behaves like an
/// empty one and resolves to 400 through the input normalizer. Every
/// degraded pipeline path (no provider, failed retrieval, failed
/// generation) still answers 200.
async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    match state.pipeline.answer(&payload).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
struct EmbedParams {
    seed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbedBody {
    #[serde(default)]
    docs: Vec<DocInput>,
}

#[derive(Debug, Deserialize)]
struct DocInput {
    id: Option<String>,
    text: String,
    #[serde(default)]
    meta: HashMap<String, String>,
}

impl From<DocInput> for Document {
    fn from(doc: DocInput) -> Self {
        Document { id: doc.id, text: doc.text, metadata: doc.meta }
    }
}

/// `POST /embed` — ingest a document batch.
///
/// A missing or empty `docs` array with `?seed=1` substitutes the
/// built-in seed corpus. Missing provider configuration and embedding
/// count mismatches are fatal here (500), unlike the query path.
async fn embed(
    State(state): State<AppState>,
    Query(params): Query<EmbedParams>,
    body: Bytes,
) -> Response {
    let payload: EmbedBody = serde_json::from_slice(&body).unwrap_or_default();
    let docs: Vec<Document> = payload.docs.into_iter().map(Document::from).collect();
    let use_seed = params.seed.as_deref() == Some("1");

    match state.pipeline.ingest(docs, use_seed).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Map pipeline errors onto the HTTP status contract.
fn error_response(err: RagError) -> Response {
    let status = match &err {
        RagError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RagError::ProviderUnavailable(_)
        | RagError::EmbeddingMismatch { .. }
        | RagError::Embedding { .. }
        | RagError::Index { .. }
        | RagError::Generation { .. }
        | RagError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
