//! HTTP surface: analysis, per-bet reads, admin and health endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::agent::ContextAgent;
use crate::error::AgentError;

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<ContextAgent>,
}

pub fn router(agent: Arc<ContextAgent>) -> Router {
    Router::new()
        .route("/analyzers/analyze", post(analyze))
        .route("/analyzers/:fixture_id/:bet_type", get(bet_analysis))
        .route("/contexts", get(contexts_summary))
        .route("/contexts/cleanup", post(cleanup))
        .route("/contexts/:fixture_id", delete(delete_context))
        .route("/contexts/:fixture_id/causal", post(update_causal))
        .route("/locks/release", post(release_lock))
        .route("/health", get(health))
        .with_state(AppState { agent })
}

struct ApiFailure(AgentError);

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            AgentError::FixtureNotFound(_) => (StatusCode::NOT_FOUND, "FixtureNotFound"),
            AgentError::Busy(_) => (StatusCode::CONFLICT, "Busy"),
            AgentError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "Timeout"),
            AgentError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "UpstreamUnavailable"),
            AgentError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "StoreFailure"),
        };

        let body = json!({"error": code, "detail": self.0.to_string()});
        (status, Json(body)).into_response()
    }
}

impl From<AgentError> for ApiFailure {
    fn from(e: AgentError) -> Self {
        Self(e)
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    fixture_id: i64,
    #[serde(default)]
    force_refresh: bool,
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let result = state
        .agent
        .get_match_context(request.fixture_id, request.force_refresh)
        .await?;

    let context = &result.context;
    let analyses: Value = context
        .analyses
        .iter()
        .map(|(bet_type, analysis)| {
            (
                bet_type.clone(),
                json!({
                    "indicators": analysis.indicators,
                    "coverage_complete": analysis.coverage_complete,
                    "data_sources": analysis.data_sources,
                }),
            )
        })
        .collect::<serde_json::Map<_, _>>()
        .into();

    Ok(Json(json!({
        "fixture_id": context.fixture_id,
        "match": format!("{} vs {}", context.home_team, context.away_team),
        "league": context.league,
        "season": context.season,
        "date": context.date.to_rfc3339(),
        "status": context.status,
        "analyses": analyses,
        "source": result.source.as_str(),
        "api_calls": result.api_calls,
    })))
}

async fn bet_analysis(
    State(state): State<AppState>,
    Path((fixture_id, bet_type)): Path<(i64, String)>,
) -> Result<Response, ApiFailure> {
    match state.agent.get_bet_analysis(fixture_id, &bet_type).await? {
        Some(view) => Ok(Json(view).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({"error": "AnalysisNotFound"})),
        )
            .into_response()),
    }
}

async fn contexts_summary(State(state): State<AppState>) -> Result<Json<Value>, ApiFailure> {
    let summaries = state.agent.contexts_summary().await?;
    Ok(Json(json!({"count": summaries.len(), "contexts": summaries})))
}

async fn delete_context(
    State(state): State<AppState>,
    Path(fixture_id): Path<i64>,
) -> Result<Json<Value>, ApiFailure> {
    let deleted = state.agent.delete_context(fixture_id).await?;
    Ok(Json(json!({"fixture_id": fixture_id, "deleted": deleted})))
}

#[derive(Debug, Deserialize)]
struct CleanupRequest {
    #[serde(default = "default_cleanup_days")]
    days: i64,
}

fn default_cleanup_days() -> i64 {
    30
}

async fn cleanup(
    State(state): State<AppState>,
    Json(request): Json<CleanupRequest>,
) -> Result<Json<Value>, ApiFailure> {
    let deleted = state.agent.cleanup_older_than(request.days).await?;
    Ok(Json(json!({"deleted": deleted, "days": request.days})))
}

async fn update_causal(
    State(state): State<AppState>,
    Path(fixture_id): Path<i64>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiFailure> {
    let updated = state.agent.update_causal_cache(fixture_id, &payload).await?;
    Ok(Json(json!({"fixture_id": fixture_id, "updated": updated})))
}

#[derive(Debug, Deserialize)]
struct ReleaseLockRequest {
    fixture_id: i64,
}

async fn release_lock(
    State(state): State<AppState>,
    Json(request): Json<ReleaseLockRequest>,
) -> Json<Value> {
    let released = state.agent.force_release_lock(request.fixture_id).await;
    Json(json!({"fixture_id": request.fixture_id, "released": released}))
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let cached = state.agent.cached_contexts().await.map(|ids| ids.len());

    match cached {
        Ok(count) => (
            StatusCode::OK,
            Json(json!({
                "service": "match-context",
                "version": env!("CARGO_PKG_VERSION"),
                "status": "ok",
                "cached_contexts": count,
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "service": "match-context",
                "version": env!("CARGO_PKG_VERSION"),
                "status": "degraded",
                "detail": e.to_string(),
            })),
        ),
    }
}
