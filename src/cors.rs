//! CORS policy construction, shared between `main.rs` and its tests.

use axum::http::{HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Builds the CORS layer for a `CORS_ALLOWED_ORIGINS` value: `"*"` (or
/// anything that yields no parseable origins) reflects any origin;
/// otherwise the comma-separated list is used verbatim.
pub fn cors_layer_from_origins(cors_allowed_origins: &str) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::PATCH,
        Method::OPTIONS,
    ];

    let base = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if cors_allowed_origins.trim() == "*" {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> =
        cors_allowed_origins.split(',').filter_map(|o| o.trim().parse().ok()).collect();

    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}
