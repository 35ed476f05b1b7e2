//! Integration tests for the CORS layer built by `cors::cors_layer_from_origins`.
//!
//! Covers:
//! - Allowed origin receives the expected response headers
//! - Preflight (OPTIONS) requests return the expected headers and status
//! - A non-matching origin does NOT receive Access-Control-Allow-Origin
//! - Wildcard "*" configuration reflects any origin

use axum::{body::Body, http::header, http::Method, http::Request, http::StatusCode, routing::get, Router};
use deckvault_core::cors::cors_layer_from_origins;
use tower::util::ServiceExt;

fn build_router(origins: &str) -> Router {
    Router::new().route("/health", get(|| async { "ok" })).layer(cors_layer_from_origins(origins))
}

#[tokio::test]
async fn allowed_origin_receives_acao_header() {
    let app = build_router("http://localhost:3000,http://localhost:3001");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn non_matching_origin_gets_no_acao_header() {
    let app = build_router("http://localhost:3000");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
}

#[tokio::test]
async fn preflight_request_gets_allow_headers() {
    let app = build_router("http://localhost:3000");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert!(response.headers().contains_key(header::ACCESS_CONTROL_MAX_AGE));
}

#[tokio::test]
async fn wildcard_configuration_reflects_any_origin() {
    let app = build_router("*");

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/health")
                .header(header::ORIGIN, "http://anything.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_some());
}
