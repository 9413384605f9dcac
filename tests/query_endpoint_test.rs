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

#[tokio::test]
async fn health_reports_online() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn query_then_repeat_is_a_cache_hit() {
    let app = test_app();

    let first = app
        .clone()
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
    assert_eq!(first.status(), StatusCode::OK);
    let body = axum::body::to_bytes(first.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["cached"], false);

    let second = app
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
    assert_eq!(second.status(), StatusCode::OK);
    let body = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["cached"], true);
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/query")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"query":"   "}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
