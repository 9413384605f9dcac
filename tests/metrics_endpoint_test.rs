#![cfg(feature = "http")]

use std::sync::Arc;

use adaptive_llm_gateway::config::GatewayConfig;
use adaptive_llm_gateway::handler::Gateway;
use adaptive_llm_gateway::http::{self, AppState};
use adaptive_llm_gateway::providers::mock::{DeterministicEmbeddingProvider, EchoLlmProvider};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    let gateway = Gateway::new(
        GatewayConfig::default(),
        Arc::new(DeterministicEmbeddingProvider { dimension: 768 }),
        Arc::new(EchoLlmProvider::new()),
    );
    http::app(AppState::new(gateway))
}

async fn get(app: &axum::Router, uri: &str) -> serde_json::Value {
    let response = app.clone().oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn cache_stats_start_empty() {
    let app = test_app();
    let body = get(&app, "/cache/stats").await;
    assert_eq!(body["stats"]["total_entries"], 0);
}

#[tokio::test]
async fn cache_clear_resets_stats_after_a_query() {
    let app = test_app();

    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"what is the capital of france"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let before = get(&app, "/cache/stats").await;
    assert_eq!(before["stats"]["total_entries"], 1);

    let clear_response = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/cache/clear").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(clear_response.status(), StatusCode::OK);

    let after = get(&app, "/cache/stats").await;
    assert_eq!(after["stats"]["total_entries"], 0);
}

#[tokio::test]
async fn metrics_endpoint_reports_hit_rate_fields() {
    let app = test_app();
    let body = get(&app, "/metrics").await;
    assert!(body["metrics"]["total_requests"].is_number());
    assert!(body["optimizer"]["next_optimization_at"].is_number());
}

#[tokio::test]
async fn eviction_history_starts_empty() {
    let app = test_app();
    let body = get(&app, "/evictions/history").await;
    assert_eq!(body["total_evictions"], 0);
    assert_eq!(body["history_count"], 0);
}
