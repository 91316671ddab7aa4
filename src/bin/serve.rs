//! Thin HTTP adapter over the engine API (§6.1). Exposes `recall_search`
//! and `chat` as JSON endpoints; this binary is intentionally minimal — the
//! wire-protocol server proper is out of scope (§1) — grounded in the
//! teacher's `mira-chat/src/server.rs` (`Router::new()` + `with_state` +
//! `axum::serve`).

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use secondbrain_engine::config::Mode;
use secondbrain_engine::conversation_store::ConversationStore;
use secondbrain_engine::orchestrator::RecallOrchestrator;
use secondbrain_engine::planner::ChatRequest;
use secondbrain_engine::ports::embedding::MockEmbeddingClient;
use secondbrain_engine::ports::rerank::MockReranker;
use secondbrain_engine::ports::vector_store::InMemoryVectorStore;
use secondbrain_engine::ports::EmbeddingPort;
use secondbrain_engine::providers::{MemoryProvider, ProviderStatusMap, VectorProvider};
use secondbrain_engine::router::{NamedProvider, ProviderRegistry};
use secondbrain_engine::trace_collector::TraceCollector;
use secondbrain_engine::{Config, EngineError, Planner};

struct AppState {
    planner: Arc<Planner>,
    registry: Arc<ProviderRegistry>,
}

#[derive(Deserialize)]
struct RecallSearchRequest {
    query: String,
    #[serde(default = "default_mode")]
    mode: String,
    top_k: Option<usize>,
    threshold: Option<f32>,
}

#[derive(Deserialize)]
struct ChatHttpRequest {
    query: String,
    session_id: Option<String>,
    #[serde(default = "default_mode")]
    mode: String,
    top_k: Option<usize>,
    threshold: Option<f32>,
}

fn default_mode() -> String {
    "conversation".to_string()
}

#[derive(serde::Serialize)]
struct ErrorBody {
    error: String,
    kind: String,
}

fn mode_or_error(raw: &str) -> Result<Mode, (StatusCode, Json<ErrorBody>)> {
    Mode::from_str(raw).map_err(|e: EngineError| {
        (StatusCode::BAD_REQUEST, Json(ErrorBody { error: e.to_string(), kind: e.kind().to_string() }))
    })
}

/// `POST /api/recall` — §6.1 operation 1.
async fn recall_search_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecallSearchRequest>,
) -> impl IntoResponse {
    let mode = match mode_or_error(&request.mode) {
        Ok(m) => m,
        Err(err) => return err.into_response(),
    };

    let packet = state
        .planner
        .recall_search(&request.query, mode, &state.registry, request.top_k, request.threshold)
        .await;

    Json(packet).into_response()
}

/// `POST /api/chat` — §6.1 operation 2.
async fn chat_handler(State(state): State<Arc<AppState>>, Json(request): Json<ChatHttpRequest>) -> impl IntoResponse {
    let mode = match mode_or_error(&request.mode) {
        Ok(m) => m,
        Err(err) => return err.into_response(),
    };

    let response = state
        .planner
        .chat(
            ChatRequest {
                query: &request.query,
                session_id: request.session_id.as_deref(),
                mode,
                top_k: request.top_k,
                threshold: request.threshold,
                force_branch: None,
            },
            &state.registry,
        )
        .await;

    match response {
        Ok(r) => Json(r).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody { error: e.to_string(), kind: e.kind().to_string() }),
        )
            .into_response(),
    }
}

/// `POST /api/ingest` — §6.1 operation 3, specified as a port only (§1).
/// This adapter does not implement ingestion; it reports that explicitly
/// rather than silently accepting documents it would drop.
async fn ingest_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "error": "ingestion is a port contract in this engine, not an implemented operation",
        })),
    )
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "alive" })))
}

fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/live", get(liveness_handler))
        .route("/api/recall", post(recall_search_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/ingest", post(ingest_handler))
        .with_state(state)
}

/// Wires the reference deployment's default providers: a mock-embedded,
/// in-memory vector provider seeded empty (a real deployment swaps this
/// for `QdrantVectorStore` + an HTTP embedding client, and optionally an
/// `ExternalMemoryProvider`, purely via `Config`/env — the orchestrator
/// code never changes).
fn build_registry(config: &Config) -> ProviderRegistry {
    let embedding: Arc<dyn EmbeddingPort> = Arc::new(MockEmbeddingClient::new(config.embedding_dimension));
    let store = Arc::new(InMemoryVectorStore::new(Vec::new()));
    let vector = VectorProvider::with_timeouts(embedding, store, config.timeouts.embed, config.timeouts.vector);

    ProviderRegistry {
        vector: Some(NamedProvider { name: "vector", provider: Arc::new(MemoryProvider::Vector(vector)) }),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Arc::new(Config::from_env()?);
    info!(embedding_dimension = config.embedding_dimension, "loaded engine configuration");

    let trace = Arc::new(TraceCollector::new(config.trace.max_events));
    let status = Arc::new(ProviderStatusMap::new(std::time::Duration::from_secs(config.provider_status.cooldown_seconds)));
    let reranker = Arc::new(MockReranker::default());
    let orchestrator = RecallOrchestrator::new(status, Some(reranker), trace.clone(), config.clone());
    let conversation = Arc::new(ConversationStore::new(config.conversation.max_turns, config.conversation.max_sessions)?);

    let planner = Arc::new(Planner::new(orchestrator, conversation, trace, None, config.clone()));
    let registry = Arc::new(build_registry(&config));

    let state = Arc::new(AppState { planner, registry });
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 8080));
    info!("secondbrain-serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
