use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::SqliteStore;
use crate::models::{ApiResponse, MatchDocument};
use crate::services::{run_daily_sync, MatchExtractor, PageSource, SyncOutcome, STATUS_ERROR};

#[derive(Clone)]
pub struct AppState {
    store: SqliteStore,
    source: Arc<dyn PageSource>,
    extractor: Arc<MatchExtractor>,
    target_url: Arc<str>,
}

impl AppState {
    pub fn new(
        store: SqliteStore,
        source: Arc<dyn PageSource>,
        extractor: MatchExtractor,
        target_url: &str,
    ) -> Self {
        Self {
            store,
            source,
            extractor: Arc::new(extractor),
            target_url: Arc::from(target_url),
        }
    }
}

pub async fn serve(port: u16, config: &Config, store: SqliteStore) -> anyhow::Result<()> {
    let state = AppState::new(
        store,
        Arc::new(config.page_source()?),
        config.extractor()?,
        &config.target_url,
    );
    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Tennis snapshot API listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/matches/scheduled", get(get_scheduled_handler))
        .route("/matches/{id}", get(get_match_handler))
        .route("/sync", post(sync_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

// GET /health
async fn health_check(State(state): State<AppState>) -> Result<Json<ApiResponse<&'static str>>, StatusCode> {
    match sqlx::query("SELECT 1").execute(state.store.pool()).await {
        Ok(_) => Ok(Json(ApiResponse::success("Tennis snapshot API is running"))),
        Err(e) => {
            tracing::error!("Health check could not reach the database: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

// GET /matches/scheduled
async fn get_scheduled_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MatchDocument>>>, StatusCode> {
    match state.store.scheduled_documents().await {
        Ok(documents) => Ok(Json(ApiResponse::success(documents))),
        Err(e) => {
            tracing::error!("Failed to load scheduled matches: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// GET /matches/{id}
async fn get_match_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MatchDocument>>, StatusCode> {
    match state.store.get_document(&id).await {
        Ok(Some(document)) => Ok(Json(ApiResponse::success(document))),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!("Failed to load match {}: {}", id, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Serialize)]
struct SyncResponse {
    status: &'static str,
    outcome: SyncOutcome,
}

// POST /sync - run one daily sync now
async fn sync_handler(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SyncResponse>>, (StatusCode, Json<ApiResponse<SyncResponse>>)> {
    match run_daily_sync(&*state.source, &state.store, &state.extractor, &state.target_url).await {
        Ok(outcome) => Ok(Json(ApiResponse::success(SyncResponse {
            status: outcome.status(),
            outcome,
        }))),
        Err(e) => {
            tracing::error!("Daily sync failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(format!("{}: {}", STATUS_ERROR, e))),
            ))
        }
    }
}
