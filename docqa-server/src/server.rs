use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use base64::Engine;
use docqa_rag::{
    Document, DocumentAnalysis, DocumentStats, FileKind, QaPipeline, RagError, extract_text,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::{Instrument, info, info_span};

use crate::{
    error::ApiError,
    protocol::{
        AskRequest, AskResponse, IndexResponse, OneShotAskRequest, SessionResponse,
        SummaryResponse, UploadRequest, UploadResponse,
    },
    session::{SessionEntry, SessionLimits, SessionManager},
};

/// Upper bound on request bodies; base64 inflates uploads by a third.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionManager,
    pub pipeline: Arc<QaPipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<QaPipeline>) -> Self {
        Self::with_limits(pipeline, SessionLimits::default())
    }

    pub fn with_limits(pipeline: Arc<QaPipeline>, limits: SessionLimits) -> Self {
        Self { sessions: SessionManager::new(limits), pipeline }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,
    pub session_limits: SessionLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            session_limits: SessionLimits::default(),
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    app_router_with_limit(state, DEFAULT_MAX_BODY_BYTES)
}

pub fn app_router_with_limit(state: AppState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/documents", post(create_document))
        .route("/api/documents/{session_id}", get(get_document).delete(delete_document))
        .route("/api/documents/{session_id}/index", post(build_index))
        .route("/api/documents/{session_id}/ask", post(ask_document))
        .route("/api/documents/{session_id}/summary", post(summarize_document))
        .route("/api/documents/{session_id}/analysis", get(analyze_document))
        .route("/api/ask", post(ask_once))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, pipeline: Arc<QaPipeline>) -> anyhow::Result<()> {
    let state = AppState::with_limits(pipeline, config.session_limits);
    let pruner = tokio::spawn(prune_idle_sessions(state.sessions.clone()));
    let app = app_router_with_limit(state, config.max_body_bytes);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for docqa server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("docqa listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    pruner.abort();
    Ok(())
}

async fn prune_idle_sessions(sessions: SessionManager) {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
        interval.tick().await;
        let pruned = sessions.prune_idle().await;
        if pruned > 0 {
            let remaining = sessions.len().await;
            info!(pruned, remaining, "pruned idle sessions");
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "docqa-server",
        "sessions": state.sessions.len().await,
    }))
}

async fn session_entry(state: &AppState, session_id: &str) -> Result<Arc<SessionEntry>, ApiError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))
}

/// Turn an upload body into a document, decoding and extracting off the async runtime.
async fn document_from_upload(request: UploadRequest) -> Result<Document, ApiError> {
    let (text, name) = match request {
        UploadRequest::Text { text, name } => (text, name),
        UploadRequest::Encoded { content_base64, mime_type, name } => {
            let kind = FileKind::from_mime(&mime_type)?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(content_base64.trim())
                .map_err(|e| ApiError::BadUpload(format!("content_base64 is not valid base64: {e}")))?;
            let text = tokio::task::spawn_blocking(move || extract_text(&bytes, kind))
                .await
                .map_err(|e| RagError::extraction(format!("extraction task failed: {e}")))??;
            (text, name)
        }
    };

    let document = Document::new(text);
    Ok(match name {
        Some(name) => document.with_name(name),
        None => document,
    })
}

async fn create_document(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let document = document_from_upload(request).await?;
    let chars = document.char_len();
    let stats = DocumentStats::of(document.text());

    let session = state.pipeline.open(document)?;
    let session_id = state.sessions.insert(session).await;
    info!(session_id = %session_id, chars, words = stats.word_count, "document uploaded");

    Ok((StatusCode::CREATED, Json(UploadResponse { session_id, chars, stats })))
}

async fn get_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ApiError> {
    let entry = session_entry(&state, &session_id).await?;
    Ok(Json(entry.describe(&session_id)))
}

async fn delete_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(&session_id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(session_id.clone()))?;
    info!(session_id = %session_id, "document session closed");
    Ok(StatusCode::NO_CONTENT)
}

async fn build_index(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<IndexResponse>, ApiError> {
    let entry = session_entry(&state, &session_id).await?;
    let index = entry
        .session
        .build_index()
        .instrument(info_span!("document.index", session_id = %session_id))
        .await?;
    Ok(Json(IndexResponse { segments: index.len(), dimensions: index.dimensions() }))
}

async fn ask_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let entry = session_entry(&state, &session_id).await?;
    let answer = entry
        .session
        .ask(&request.question, request.top_k)
        .instrument(info_span!("document.ask", session_id = %session_id))
        .await?;
    Ok(Json(answer.into()))
}

async fn summarize_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let entry = session_entry(&state, &session_id).await?;
    let summary = entry
        .session
        .summarize()
        .instrument(info_span!("document.summarize", session_id = %session_id))
        .await?;
    Ok(Json(SummaryResponse { summary }))
}

async fn analyze_document(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DocumentAnalysis>, ApiError> {
    let entry = session_entry(&state, &session_id).await?;
    Ok(Json(entry.session.analyze()))
}

async fn ask_once(
    State(state): State<AppState>,
    Json(request): Json<OneShotAskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let session = state.pipeline.open(Document::new(request.text))?;
    let answer = session
        .ask(&request.question, request.top_k)
        .instrument(info_span!("document.ask_once"))
        .await?;
    Ok(Json(answer.into()))
}
