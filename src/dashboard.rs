//! Read-only dashboard/health HTTP API: every response is a
//! pure projection of the entity store, the scheduler's health map, or the
//! paper trader's snapshot — this module never mutates anything except the
//! custom-watchlist CRUD endpoints, which write through the same
//! `EntityStore::upsert_custom_watchlist` / `deactivate_custom_watchlist`
//! path the nightly maintenance job uses.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::context::AppContext;
use alpha_entities::{ChainId, CustomWatchlistWallet};

pub fn router(ctx: AppContext, scheduler_health: Arc<alpha_scheduler::Scheduler>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/stats/overview", get(overview))
        .route("/wallets/top", get(top_wallets))
        .route("/trades/recent", get(recent_trades))
        .route("/tokens/trending", get(trending_tokens))
        .route("/alerts/recent", get(recent_alerts))
        .route("/performance/score", get(performance_score))
        .route("/paper/status", get(paper_status))
        .route("/watchlist", get(watchlist))
        .route("/watchlist", post(add_watchlist_entry))
        .route("/watchlist/:address", delete(remove_watchlist_entry))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(DashboardState { ctx, scheduler: scheduler_health })
}

#[derive(Clone)]
struct DashboardState {
    ctx: AppContext,
    scheduler: Arc<alpha_scheduler::Scheduler>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    server_time: chrono::DateTime<Utc>,
    jobs: Vec<JobHealthView>,
}

#[derive(Serialize)]
struct JobHealthView {
    job_id: String,
    last_success: Option<chrono::DateTime<Utc>>,
    last_failure: Option<(chrono::DateTime<Utc>, String)>,
    consecutive_failures: u32,
}

async fn health(State(state): State<DashboardState>) -> impl IntoResponse {
    let jobs = state
        .scheduler
        .health_snapshot()
        .into_iter()
        .map(|(job_id, health)| JobHealthView {
            job_id,
            last_success: health.last_success,
            last_failure: health.last_failure,
            consecutive_failures: health.consecutive_failures,
        })
        .collect();
    Json(HealthResponse {
        status: "ok",
        server_time: Utc::now(),
        jobs,
    })
}

#[derive(Serialize)]
struct OverviewResponse {
    tokens_tracked: usize,
    wallets_tracked: usize,
    active_watchlist_size: usize,
    alerts_last_24h: usize,
    paper_cash_balance_usd: f64,
    paper_open_positions: usize,
}

async fn overview(State(state): State<DashboardState>) -> Result<impl IntoResponse, ApiError> {
    let tokens = state.ctx.store.all_tokens().await?;
    let wallets = state.ctx.store.all_wallets().await?;
    let custom = state.ctx.store.active_custom_watchlist().await?;
    let alerts = state.ctx.store.recent_alerts(Utc::now() - Duration::hours(24)).await?;
    let paper = state.ctx.paper_trader.snapshot().await;

    Ok(Json(OverviewResponse {
        tokens_tracked: tokens.len(),
        wallets_tracked: wallets.len(),
        active_watchlist_size: custom.len(),
        alerts_last_24h: alerts.len(),
        paper_cash_balance_usd: paper.cash_balance_usd,
        paper_open_positions: paper.open_positions.len(),
    }))
}

#[derive(Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn top_wallets(
    State(state): State<DashboardState>,
    axum::extract::Query(q): axum::extract::Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut stats = state.ctx.store.all_wallet_stats().await?;
    stats.sort_by(|a, b| b.unrealized_pnl_usd.partial_cmp(&a.unrealized_pnl_usd).unwrap());
    stats.truncate(q.limit.unwrap_or(50));
    Ok(Json(stats))
}

async fn recent_trades(
    State(state): State<DashboardState>,
    axum::extract::Query(q): axum::extract::Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let trades = state.ctx.store.recent_trades(q.limit.unwrap_or(100)).await?;
    Ok(Json(trades))
}

async fn trending_tokens(State(state): State<DashboardState>) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - Duration::hours(state.ctx.config.scheduler.recent_seed_horizon_hours);
    let seeds = state.ctx.store.recent_seed_tokens(since).await?;
    Ok(Json(seeds))
}

async fn recent_alerts(
    State(state): State<DashboardState>,
    axum::extract::Query(q): axum::extract::Query<LimitQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let mut alerts = state.ctx.store.recent_alerts(Utc::now() - Duration::days(7)).await?;
    alerts.sort_by_key(|a| std::cmp::Reverse(a.ts));
    alerts.truncate(q.limit.unwrap_or(100));
    Ok(Json(alerts))
}

#[derive(Serialize)]
struct PerformanceResponse {
    score: i32,
    total_rewards: i32,
    total_punishments: i32,
    alerts_scored: usize,
    normalized_win_rate: Option<f64>,
}

async fn performance_score(State(state): State<DashboardState>) -> Result<impl IntoResponse, ApiError> {
    let since = Utc::now() - Duration::days(7);
    let alerts = state.ctx.store.recent_alerts(since).await?;
    let alerts_scored = alerts.len();
    let (score, normalized_win_rate) = crate::jobs::score_recent_alerts(&state.ctx, &alerts).await;
    Ok(Json(PerformanceResponse {
        score: score.score,
        total_rewards: score.total_rewards,
        total_punishments: score.total_punishments,
        alerts_scored,
        normalized_win_rate,
    }))
}

async fn paper_status(State(state): State<DashboardState>) -> impl IntoResponse {
    Json(state.ctx.paper_trader.snapshot().await)
}

async fn watchlist(State(state): State<DashboardState>) -> Result<impl IntoResponse, ApiError> {
    let entries = state.ctx.store.active_custom_watchlist().await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
struct AddWatchlistRequest {
    address: String,
    chain_id: String,
    label: Option<String>,
}

async fn add_watchlist_entry(
    State(state): State<DashboardState>,
    Json(req): Json<AddWatchlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chain_id = ChainId::from_str(&req.chain_id)
        .map_err(|e| ApiError::BadRequest(e))?;
    state
        .ctx
        .store
        .upsert_custom_watchlist(CustomWatchlistWallet {
            address: req.address,
            chain_id,
            added_at: Utc::now(),
            label: req.label,
            is_active: true,
            notes: None,
        })
        .await?;
    Ok(StatusCode::CREATED)
}

async fn remove_watchlist_entry(
    State(state): State<DashboardState>,
    Path(address): Path<String>,
    axum::extract::Query(q): axum::extract::Query<ChainQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let chain_id = ChainId::from_str(&q.chain_id).map_err(ApiError::BadRequest)?;
    state.ctx.store.deactivate_custom_watchlist(&address, chain_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ChainQuery {
    chain_id: String,
}

enum ApiError {
    BadRequest(String),
    Store(alpha_entities::StoreError),
}

impl From<alpha_entities::StoreError> for ApiError {
    fn from(err: alpha_entities::StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Store(err) => {
                warn!(error = %err, "dashboard request failed against entity store");
                (StatusCode::INTERNAL_SERVER_ERROR, "entity store error".to_string())
            }
        };
        (status, message).into_response()
    }
}
