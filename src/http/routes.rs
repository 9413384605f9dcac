use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

use super::state::AppState;
use crate::types::Analysis;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .route("/metrics", get(metrics))
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(cache_clear))
        .route("/cache/entries", get(cache_entries))
        .route("/evictions/history", get(eviction_history))
        .route("/optimizer/history", get(optimizer_history))
        .with_state(state)
}

fn unix_secs_now() -> u64 {
    SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "system": "adaptive-llm-gateway",
        "version": crate::version::version_string(),
    }))
}

/// Request body for `/query`. `analysis` is optional: the upstream intent
/// classifier is out of scope for this service, so a caller that doesn't
/// supply one gets routing/caching behavior driven by `Analysis::default()`.
#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    analysis: Option<Analysis>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueryResponseBody {
    response: String,
    cached: bool,
    similarity_score: Option<f64>,
    tokens_used: u64,
    tokens_saved: u64,
    cost: f64,
    cost_saved: f64,
    latency_ms: f64,
}

struct ApiError(crate::GatewayError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            crate::GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ if self.0.is_transient() => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<crate::GatewayError> for ApiError {
    fn from(err: crate::GatewayError) -> Self {
        Self(err)
    }
}

async fn query(
    State(state): State<AppState>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponseBody>, ApiError> {
    let started = std::time::Instant::now();

    if body.query.trim().is_empty() {
        return Err(ApiError(crate::GatewayError::InvalidRequest("query must not be empty".into())));
    }

    let input_token_count = estimate_input_tokens(body.query.len());
    let request = crate::types::GatewayRequest {
        request_id: uuid_like(),
        created_at_ms: started.elapsed().as_millis() as i64,
        query_text: body.query,
        analysis: body.analysis.unwrap_or_default(),
        input_token_count,
        user_id: body.user_id,
        max_tokens: body.max_tokens,
        temperature: body.temperature,
    };

    let response = state.gateway.handle_query(request).await?;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    Ok(Json(QueryResponseBody {
        response: response.response_text,
        cached: response.cache_hit,
        similarity_score: response.similarity_score,
        tokens_used: response.input_tokens + response.output_tokens,
        tokens_saved: if response.cache_hit { response.cost_saved as u64 } else { 0 },
        cost: response.cost,
        cost_saved: response.cost_saved,
        latency_ms,
    }))
}

fn estimate_input_tokens(char_len: usize) -> u32 {
    ((char_len / 4).max(1)) as u32
}

async fn metrics(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.gateway.cache.lock().await;
    let optimizer = state.gateway.optimizer.lock().await;
    let total_requests = cache.metrics().total_requests;
    Json(serde_json::json!({
        "metrics": cache.metrics(),
        "optimizer": optimizer.summary(&cache, total_requests),
    }))
}

async fn cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.gateway.cache.lock().await;
    Json(serde_json::json!({
        "stats": cache.stats(),
        "metrics": cache.metrics(),
    }))
}

async fn cache_clear(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut cache = state.gateway.cache.lock().await;
    cache.clear();
    Json(serde_json::json!({ "status": "success", "message": "cache cleared" }))
}

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<usize>,
}

async fn cache_entries(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Json<serde_json::Value> {
    let limit = q.limit.unwrap_or(20).min(20);
    let cache = state.gateway.cache.lock().await;
    let stats = cache.stats();
    let shown: Vec<_> = stats.top_queries.into_iter().take(limit).collect();
    Json(serde_json::json!({
        "total_entries": stats.total_entries,
        "showing": shown.len(),
        "entries": shown,
    }))
}

async fn eviction_history(State(state): State<AppState>, Query(q): Query<LimitQuery>) -> Json<serde_json::Value> {
    let limit = q.limit.unwrap_or(100);
    let cache = state.gateway.cache.lock().await;
    let history = cache.eviction_history(limit);
    Json(serde_json::json!({
        "total_evictions": cache.metrics().evictions,
        "history_count": history.len(),
        "evictions": history,
    }))
}

async fn optimizer_history(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.gateway.cache.lock().await;
    let optimizer = state.gateway.optimizer.lock().await;
    let total_requests = cache.metrics().total_requests;
    Json(serde_json::json!(optimizer.summary(&cache, total_requests)))
}

/// Timestamp-derived request id; good enough in the absence of an upstream
/// request-id header or a UUID dependency.
fn uuid_like() -> String {
    format!("req-{}", unix_secs_now())
}
