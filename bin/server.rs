// Evaluation Forms - Web Server
// JSON API over the form workflow with Axum

use anyhow::{anyhow, Context};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use evaluation_forms::{
    init_logging, sink_from_config, AppConfig, Answer, ChoicePolicy, CsvSource, Evaluator,
    FormError, NormalizationTable, SubmissionSink, TableCache, Tables, VERSION,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    cache: Arc<Mutex<TableCache<CsvSource>>>,
    labels: Arc<NormalizationTable>,
    policy: ChoicePolicy,
    sink: Arc<dyn SubmissionSink>,
}

impl AppState {
    /// Current table snapshot; the cache lock is released before returning
    fn tables(&self) -> Result<Arc<Tables>, FormError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| FormError::Source(anyhow!("table cache lock poisoned")))?;
        cache.tables().map_err(FormError::Source)
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Set on failures the user can simply retry
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    retryable: bool,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            retryable: false,
        }
    }
}

impl ApiResponse<()> {
    fn err(error: &FormError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            retryable: error.is_retryable(),
        }
    }
}

/// Body of POST /api/profiles/:id/submission
#[derive(Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    observations: String,
    #[serde(default)]
    answers: Vec<Answer>,
}

fn error_response(err: FormError) -> Response {
    let status = match &err {
        FormError::NotFound { .. } => StatusCode::NOT_FOUND,
        FormError::Transport(_) => StatusCode::BAD_GATEWAY,
        FormError::Source(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status != StatusCode::NOT_FOUND {
        error!("request failed: {}", err);
    }
    (status, Json(ApiResponse::err(&err))).into_response()
}

/// Run blocking core/sink work off the async runtime
async fn run_blocking<T, F>(state: AppState, work: F) -> Response
where
    F: FnOnce(&AppState) -> Result<T, FormError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&state)).await {
        Ok(Ok(data)) => (StatusCode::OK, Json(ApiResponse::ok(data))).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_err) => error_response(FormError::Source(anyhow!(
            "worker task failed: {}",
            join_err
        ))),
    }
}

// ============================================================================
// API Handlers
// ============================================================================

#[derive(Serialize)]
struct Health {
    version: &'static str,
    normalization: String,
    tables_loaded: bool,
}

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> Response {
    let tables_loaded = match state.cache.lock() {
        Ok(cache) => cache.is_loaded(),
        Err(_) => {
            return error_response(FormError::Source(anyhow!("table cache lock poisoned")))
        }
    };
    Json(ApiResponse::ok(Health {
        version: VERSION,
        normalization: state.labels.version().to_string(),
        tables_loaded,
    }))
    .into_response()
}

/// GET /api/profiles - Everyone with their completion status
async fn list_profiles(State(state): State<AppState>) -> Response {
    run_blocking(state, |state| {
        let tables = state.tables()?;
        Evaluator::new(&tables, &state.labels, state.policy).status_board(state.sink.as_ref())
    })
    .await
}

/// GET /api/profiles/:id/form - Questionnaire for one person
async fn get_form(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    run_blocking(state, move |state| {
        let tables = state.tables()?;
        Evaluator::new(&tables, &state.labels, state.policy).prepare_form(&id)
    })
    .await
}

/// POST /api/profiles/:id/submission - Finalize and deliver
async fn submit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SubmitRequest>,
) -> Response {
    run_blocking(state, move |state| {
        let tables = state.tables()?;
        Evaluator::new(&tables, &state.labels, state.policy).finalize(
            &id,
            request.answers,
            &request.observations,
            state.sink.as_ref(),
        )
    })
    .await
}

/// POST /api/refresh - Reload the source tables on next access
async fn refresh(State(state): State<AppState>) -> Response {
    run_blocking(state, |state| {
        let mut cache = state
            .cache
            .lock()
            .map_err(|_| FormError::Source(anyhow!("table cache lock poisoned")))?;
        cache.invalidate();
        info!("source tables invalidated");
        Ok("OK")
    })
    .await
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = AppConfig::from_env()?;
    let labels = config.normalization_table()?;
    info!(version = labels.version(), "normalization table loaded");

    let sink: Arc<dyn SubmissionSink> = Arc::from(sink_from_config(&config.sink)?);

    // Create shared state
    let state = AppState {
        cache: Arc::new(Mutex::new(TableCache::new(config.source()))),
        labels: Arc::new(labels),
        policy: config.choices,
        sink,
    };

    // Fail fast on unreadable tables
    state
        .tables()
        .context("Failed to load source tables at startup")?;

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/profiles", get(list_profiles))
        .route("/profiles/:id/form", get(get_form))
        .route("/profiles/:id/submission", post(submit))
        .route("/refresh", post(refresh))
        .with_state(state);

    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server running");
    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
