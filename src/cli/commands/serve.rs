//! HTTP API server for integration with other systems.
//!
//! Each session owns one retrieval pipeline. A client creates a session with
//! a transcript, then queries or searches it until the session is deleted or
//! sits idle past the configured timeout.

use super::build_generator;
use crate::cli::Output;
use crate::config::{ServerSettings, Settings};
use crate::error::{GenerationError, PipelineError};
use crate::generation::{AnswerGenerator, GroqGenerator, ModelInfo};
use crate::pipeline::{InitializeSummary, PipelineConfig, RetrievalPipeline};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use uuid::Uuid;

/// Shared application state.
struct AppState {
    config: PipelineConfig,
    default_model: String,
    generator: Arc<dyn AnswerGenerator>,
    catalog: Arc<GroqGenerator>,
    sessions: SessionStore,
}

struct SessionEntry {
    pipeline: Arc<RetrievalPipeline>,
    last_used: Instant,
}

/// Live sessions, bounded in number and expired after an idle period.
struct SessionStore {
    max_sessions: usize,
    idle_timeout: Duration,
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl SessionStore {
    fn new(max_sessions: usize, idle_timeout: Duration) -> Self {
        Self {
            max_sessions,
            idle_timeout,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn from_settings(settings: &ServerSettings) -> Self {
        Self::new(settings.max_sessions, settings.session_idle_timeout())
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Look up a session and mark it as used at `now`.
    fn get(&self, id: Uuid, now: Instant) -> Result<Arc<RetrievalPipeline>, ApiError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let expired = match entries.get_mut(&id) {
            Some(entry) if !self.is_idle(entry, now) => {
                entry.last_used = now;
                return Ok(entry.pipeline.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(&id);
            debug!("Session {} expired", id);
        }
        Err(ApiError::session_not_found(id))
    }

    /// Store a new session, first dropping idle ones.
    fn insert(&self, pipeline: RetrievalPipeline, now: Instant) -> Result<Uuid, ApiError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, entry| !self.is_idle(entry, now));

        if entries.len() >= self.max_sessions {
            return Err(ApiError::session_limit(self.max_sessions));
        }

        let id = Uuid::new_v4();
        entries.insert(
            id,
            SessionEntry {
                pipeline: Arc::new(pipeline),
                last_used: now,
            },
        );
        Ok(id)
    }

    fn remove(&self, id: Uuid) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    /// Drop sessions idle at `now`; returns how many were dropped.
    fn evict_idle(&self, now: Instant) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !self.is_idle(entry, now));
        before - entries.len()
    }

    fn is_idle(&self, entry: &SessionEntry, now: Instant) -> bool {
        now.saturating_duration_since(entry.last_used) > self.idle_timeout
    }
}

impl AppState {
    fn session(&self, id: Uuid) -> Result<Arc<RetrievalPipeline>, ApiError> {
        self.sessions.get(id, Instant::now())
    }
}

/// Periodically drop idle sessions for as long as the server runs.
async fn sweep_idle_sessions(state: Arc<AppState>) {
    let period = (state.sessions.idle_timeout / 4).max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        let evicted = state.sessions.evict_idle(Instant::now());
        if evicted > 0 {
            info!("Expired {} idle sessions ({} remain)", evicted, state.sessions.len());
        }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    settings: Settings,
) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    if settings.generation.api_key().is_none() {
        Output::warning(&format!(
            "{} is not set; queries will fail until it is.",
            settings.generation.api_key_env
        ));
    }

    let generator = Arc::new(build_generator(&settings)?);
    let state = Arc::new(AppState {
        config: settings.pipeline_config(),
        default_model: settings.generation.default_model.clone(),
        generator: generator.clone(),
        catalog: generator,
        sessions: SessionStore::from_settings(&settings.server),
    });
    tokio::spawn(sweep_idle_sessions(state.clone()));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("VideoMind API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Models", "GET    /models");
    Output::kv("Create session", "POST   /sessions");
    Output::kv("Replace transcript", "PUT    /sessions/{id}/transcript");
    Output::kv("Query", "POST   /sessions/{id}/query");
    Output::kv("Search", "POST   /sessions/{id}/search");
    Output::kv("Delete session", "DELETE /sessions/{id}");
    println!();
    Output::kv(
        "Sessions",
        &format!(
            "at most {}, expire after {}s idle",
            settings.server.max_sessions, settings.server.session_idle_secs
        ),
    );
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/models", get(list_models))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", axum::routing::delete(delete_session))
        .route("/sessions/{id}/transcript", put(replace_transcript))
        .route("/sessions/{id}/query", post(query))
        .route("/sessions/{id}/search", post(search))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct TranscriptRequest {
    transcript: String,
}

#[derive(Serialize)]
struct SessionResponse {
    session_id: Uuid,
    chunk_count: usize,
    character_count: usize,
}

impl SessionResponse {
    fn new(session_id: Uuid, summary: InitializeSummary) -> Self {
        Self {
            session_id,
            chunk_count: summary.chunk_count,
            character_count: summary.character_count,
        }
    }
}

#[derive(Deserialize)]
struct QueryRequest {
    question: String,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

#[derive(Serialize)]
struct SearchResult {
    ordinal: usize,
    score: u32,
    text: String,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// An error rendered as `{error, kind}` with a matching status code.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn session_not_found(id: Uuid) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            kind: "session_not_found",
            message: format!("Session not found: {}", id),
        }
    }

    fn session_limit(max: usize) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            kind: "session_limit",
            message: format!("Too many open sessions (limit {}); delete one first", max),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::InvalidTranscript(_)
            | PipelineError::InvalidParameter(_)
            | PipelineError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotInitialized => StatusCode::CONFLICT,
            PipelineError::NoContextAvailable => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::GenerationTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::GenerationFailure {
                source: GenerationError::RateLimited(_),
                ..
            } => StatusCode::TOO_MANY_REQUESTS,
            PipelineError::GenerationFailure { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                kind: self.kind,
            }),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ModelsResponse {
        models: state.catalog.list_models().await,
    })
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TranscriptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let pipeline = RetrievalPipeline::with_config(state.config, state.generator.clone());
    let summary = pipeline.initialize(&req.transcript)?;

    let id = state.sessions.insert(pipeline, Instant::now())?;
    info!("Created session {} ({} chunks)", id, summary.chunk_count);

    Ok((StatusCode::CREATED, Json(SessionResponse::new(id, summary))))
}

async fn replace_transcript(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TranscriptRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let pipeline = state.session(id)?;
    let summary = pipeline.initialize(&req.transcript)?;
    debug!("Session {} reloaded ({} chunks)", id, summary.chunk_count);

    Ok(Json(SessionResponse::new(id, summary)))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let pipeline = state.session(id)?;
    let model = req.model.unwrap_or_else(|| state.default_model.clone());

    let answer = pipeline.query(&req.question, &model).await?;
    Ok(Json(QueryResponse { answer }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let pipeline = state.session(id)?;
    let results = pipeline
        .search(&req.query)?
        .into_iter()
        .map(|r| SearchResult {
            ordinal: r.ordinal(),
            score: r.score,
            text: r.chunk.text,
        })
        .collect();

    Ok(Json(SearchResponse { results }))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id) {
        info!("Deleted session {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::session_not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::stub::StubGenerator;
    use serde_json::{json, Value};

    const TRANSCRIPT: &str = "Welcome to the channel. Today we cover sourdough baking. \
        The starter needs feeding every day. Bake the loaf at a high temperature.";

    async fn spawn_server(stub: StubGenerator) -> String {
        spawn_server_with(stub, SessionStore::new(16, Duration::from_secs(600))).await
    }

    async fn spawn_server_with(stub: StubGenerator, sessions: SessionStore) -> String {
        let catalog = GroqGenerator::new("http://127.0.0.1:1", None, Duration::from_secs(1))
            .unwrap()
            .with_models_timeout(Duration::from_millis(200));
        let state = Arc::new(AppState {
            config: PipelineConfig::default(),
            default_model: "llama3-8b-8192".to_string(),
            generator: Arc::new(stub),
            catalog: Arc::new(catalog),
            sessions,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn create(client: &reqwest::Client, base: &str) -> String {
        let body: Value = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "transcript": TRANSCRIPT }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_server(StubGenerator::default()).await;
        let response = reqwest::get(format!("{base}/health")).await.unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_models_fall_back_when_catalog_unreachable() {
        let base = spawn_server(StubGenerator::default()).await;
        let response = reqwest::get(format!("{base}/models")).await.unwrap();
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["models"][0]["id"], "llama3-8b-8192");
        assert_eq!(body["models"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_session_query_flow() {
        let stub = StubGenerator::default();
        let base = spawn_server(stub.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "transcript": TRANSCRIPT }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["chunk_count"], 1);
        assert_eq!(body["character_count"], TRANSCRIPT.chars().count());
        let id = body["session_id"].as_str().unwrap();

        let response = client
            .post(format!("{base}/sessions/{id}/query"))
            .json(&json!({ "question": "How often is the starter fed?", "model": "gemma-7b-it" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["answer"], "stub answer");

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model_id, "gemma-7b-it");
        assert!(requests[0].context.contains("starter"));
    }

    #[tokio::test]
    async fn test_search_returns_scores() {
        let base = spawn_server(StubGenerator::default()).await;
        let client = reqwest::Client::new();
        let id = create(&client, &base).await;

        let body: Value = client
            .post(format!("{base}/sessions/{id}/search"))
            .json(&json!({ "query": "sourdough starter" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["results"][0]["ordinal"], 0);
        assert_eq!(body["results"][0]["score"], 2);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let base = spawn_server(StubGenerator::default()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "transcript": "  short " }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "invalid_transcript");

        let unknown = Uuid::new_v4();
        let response = client
            .post(format!("{base}/sessions/{unknown}/query"))
            .json(&json!({ "question": "anything?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        let id = create(&client, &base).await;
        let response = client
            .post(format!("{base}/sessions/{id}/query"))
            .json(&json!({ "question": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "invalid_query");
    }

    #[tokio::test]
    async fn test_failed_reload_leaves_session_uninitialized() {
        let base = spawn_server(StubGenerator::default()).await;
        let client = reqwest::Client::new();
        let id = create(&client, &base).await;

        let response = client
            .put(format!("{base}/sessions/{id}/transcript"))
            .json(&json!({ "transcript": "tiny" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

        let response = client
            .post(format!("{base}/sessions/{id}/query"))
            .json(&json!({ "question": "How often is the starter fed?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CONFLICT);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "not_initialized");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_429() {
        let base = spawn_server(StubGenerator::rate_limited()).await;
        let client = reqwest::Client::new();
        let id = create(&client, &base).await;

        let response = client
            .post(format!("{base}/sessions/{id}/query"))
            .json(&json!({ "question": "How often is the starter fed?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::TOO_MANY_REQUESTS);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "generation_failure");
    }

    #[tokio::test]
    async fn test_delete_session() {
        let base = spawn_server(StubGenerator::default()).await;
        let client = reqwest::Client::new();
        let id = create(&client, &base).await;

        let response = client.delete(format!("{base}/sessions/{id}")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NO_CONTENT);

        let response = client.delete(format!("{base}/sessions/{id}")).send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_session_limit() {
        let base = spawn_server_with(
            StubGenerator::default(),
            SessionStore::new(1, Duration::from_secs(600)),
        )
        .await;
        let client = reqwest::Client::new();
        let id = create(&client, &base).await;

        let response = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "transcript": TRANSCRIPT }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["kind"], "session_limit");

        client.delete(format!("{base}/sessions/{id}")).send().await.unwrap();
        let response = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "transcript": TRANSCRIPT }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    }

    fn stub_pipeline() -> RetrievalPipeline {
        let pipeline = RetrievalPipeline::new(Arc::new(StubGenerator::default()));
        pipeline.initialize(TRANSCRIPT).unwrap();
        pipeline
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = SessionStore::new(4, Duration::from_secs(60));
        let start = Instant::now();

        let stale = store.insert(stub_pipeline(), start).unwrap();
        let fresh = store.insert(stub_pipeline(), start).unwrap();

        // Using a session keeps it alive.
        assert!(store.get(fresh, start + Duration::from_secs(50)).is_ok());

        assert_eq!(store.evict_idle(start + Duration::from_secs(90)), 1);
        assert_eq!(store.len(), 1);
        let err = store.get(stale, start + Duration::from_secs(90)).err().unwrap();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert!(store.get(fresh, start + Duration::from_secs(90)).is_ok());
    }

    #[test]
    fn test_expired_session_is_dropped_on_lookup() {
        let store = SessionStore::new(4, Duration::from_secs(60));
        let start = Instant::now();
        let id = store.insert(stub_pipeline(), start).unwrap();

        assert!(store.get(id, start + Duration::from_secs(61)).is_err());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_idle_sessions_free_capacity() {
        let store = SessionStore::new(1, Duration::from_secs(60));
        let start = Instant::now();
        store.insert(stub_pipeline(), start).unwrap();

        assert!(store.insert(stub_pipeline(), start + Duration::from_secs(10)).is_err());
        assert!(store.insert(stub_pipeline(), start + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = ApiError::from(PipelineError::GenerationTimeout {
            stage: crate::error::QueryStage::Generation,
            timeout: Duration::from_secs(30),
        });
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.kind, "generation_timeout");

        let err = ApiError::from(PipelineError::NoContextAvailable);
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
