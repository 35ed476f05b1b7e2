//! Request timing, correlation ids, and the health probe (C12).

use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use std::time::Instant;
use uuid::Uuid;

/// Correlation id attached to every request, propagated to logs and
/// reflected back in `X-Request-ID`.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attaches a request id (reusing an inbound `X-Request-ID` if present),
/// times the request, and stamps `X-Response-Time`/`X-Request-ID` on the
/// way out.
pub async fn timing_middleware(mut req: Request<Body>, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(request_id.clone()));

    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;
    let elapsed = start.elapsed();

    tracing::info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "request completed"
    );

    let (mut parts, body) = response.into_parts();
    if let Ok(v) = HeaderValue::from_str(&request_id) {
        parts.headers.insert("X-Request-ID", v);
    }
    if let Ok(v) = HeaderValue::from_str(&format!("{}ms", elapsed.as_millis())) {
        parts.headers.insert("X-Response-Time", v);
    }
    Response::from_parts(parts, body)
}

/// `GET /actuator/health` (and `/api/health`) — a liveness probe that
/// never touches the database or coordination store so it stays cheap
/// under load and useful during an outage.
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "success": true,
        "message": "ok",
        "data": { "status": "UP", "version": env!("CARGO_PKG_VERSION") }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_round_trips_through_display() {
        let id = RequestId::new();
        assert_eq!(format!("{id}"), id.0);
    }
}
