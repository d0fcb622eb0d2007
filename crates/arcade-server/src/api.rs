use std::sync::Arc;

use arcade_shared::constants::DEFAULT_PAGE_LIMIT;
use arcade_shared::{GameMode, LeaderboardEntry, Page, SortKey, Stats};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::service::LeaderboardService;

#[derive(Clone)]
pub struct AppState {
    pub service: LeaderboardService,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    // Only submissions are throttled; reads stay cheap.
    let submit = axum::routing::post(submit_score).route_layer(middleware::from_fn_with_state(
        state.rate_limiter.clone(),
        rate_limit_middleware,
    ));

    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(health_check_db))
        .route("/api/v1/leaderboard", get(get_leaderboard).merge(submit))
        .route("/api/v1/leaderboard/stats/summary", get(get_stats))
        .route("/api/v1/leaderboard/:username", get(get_user_scores))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─── Request / response shapes ───

#[derive(Deserialize)]
struct SubmitScoreRequest {
    username: String,
    score: i64,
    mode: String,
}

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    mode: Option<String>,
    sort: Option<String>,
}

#[derive(Deserialize)]
struct UserScoresQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    mode: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    version: &'static str,
}

#[derive(Serialize)]
struct DbHealthResponse {
    status: &'static str,
    db_connected: bool,
    timestamp: String,
}

fn parse_mode(raw: Option<&str>) -> Result<Option<GameMode>, ServerError> {
    raw.filter(|m| !m.is_empty())
        .map(|m| m.parse::<GameMode>())
        .transpose()
        .map_err(ServerError::from)
}

// ─── Handlers ───

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn health_check_db(State(state): State<AppState>) -> Json<DbHealthResponse> {
    let connected = state.service.database_healthy().await;
    Json(DbHealthResponse {
        status: if connected { "healthy" } else { "unhealthy" },
        db_connected: connected,
        timestamp: Utc::now().to_rfc3339(),
    })
}

async fn submit_score(
    State(state): State<AppState>,
    payload: Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LeaderboardEntry>), ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;

    let entry = state
        .service
        .submit_score(&req.username, req.score, &req.mode)
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

async fn get_leaderboard(
    State(state): State<AppState>,
    query: Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<Page>, ServerError> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let mode = parse_mode(query.mode.as_deref())?;
    let sort = match query.sort.as_deref() {
        None | Some("") => SortKey::default(),
        Some(raw) => raw.parse::<SortKey>().map_err(ServerError::BadRequest)?,
    };

    let page = state
        .service
        .get_leaderboard(
            query.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT)),
            query.offset.unwrap_or(0),
            mode,
            sort,
        )
        .await?;
    Ok(Json(page))
}

async fn get_user_scores(
    State(state): State<AppState>,
    Path(username): Path<String>,
    query: Result<Query<UserScoresQuery>, QueryRejection>,
) -> Result<Json<Page>, ServerError> {
    let Query(query) = query.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let mode = parse_mode(query.mode.as_deref())?;
    let page = state
        .service
        .get_user_scores(
            &username,
            query.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT)),
            query.offset.unwrap_or(0),
            mode,
        )
        .await?;
    Ok(Json(page))
}

async fn get_stats(State(state): State<AppState>) -> Result<Json<Stats>, ServerError> {
    Ok(Json(state.service.get_stats().await?))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
