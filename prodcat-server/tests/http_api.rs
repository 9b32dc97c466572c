//! Router-level tests that run without a database.
//!
//! The connection manager does no I/O until a query is dispatched, so the
//! health route can be exercised directly; the products route is pointed at
//! an unreachable backend with a bounded retry policy to observe the error
//! mapping.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use prodcat_core::DbConfig;
use prodcat_server::db::{ConnectionManager, RetryPolicy};
use prodcat_server::{build_router, AppState, ServerConfig};

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_connecting_before_first_query() {
    let state = AppState::new(ConnectionManager::new(&DbConfig::default()));
    let app = build_router(state, &ServerConfig::default());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db"], "connecting");
}

#[tokio::test]
async fn fetch_products_maps_connection_failure_to_generic_500() {
    // port 1 refuses immediately; one attempt, no delay worth waiting for
    let config = DbConfig {
        host: "127.0.0.1".into(),
        port: 1,
        ..DbConfig::default()
    };
    let policy = RetryPolicy {
        delay: Duration::from_millis(10),
        max_attempts: Some(1),
    };
    let state = AppState::new(ConnectionManager::with_policy(&config, policy));
    let app = build_router(state, &ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/fetch_products")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["status"], "0");
    assert_eq!(body["message"], "Database error");
}

#[tokio::test]
async fn cors_allows_localhost_origins_only() {
    let state = AppState::new(ConnectionManager::new(&DbConfig::default()));
    let app = build_router(state, &ServerConfig::default());

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("http://localhost:3000")
    );

    let rejected = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(rejected
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn permissive_cors_is_opt_in() {
    let state = AppState::new(ConnectionManager::new(&DbConfig::default()));
    let config = ServerConfig {
        cors_permissive: true,
        ..ServerConfig::default()
    };
    let app = build_router(state, &config);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("origin", "http://anywhere.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap()),
        Some("*")
    );
}

#[tokio::test]
async fn unknown_route_is_404() {
    let state = AppState::new(ConnectionManager::new(&DbConfig::default()));
    let app = build_router(state, &ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/fetch_everything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
