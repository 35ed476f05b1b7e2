//! Error taxonomy shared by every handler and service.
//!
//! Mirrors the kind -> HTTP status mapping in the spec's error handling
//! design: validation, authentication, authorization, not-found,
//! conflict, rate-limited, internal. Every variant renders the
//! `{success,message,data?}` envelope used across the API.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Authentication(String),
    Authorization(String),
    NotFound(String),
    Conflict(String),
    RateLimited(String),
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn status_and_message(&self) -> (StatusCode, &str) {
        match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.as_str()),
            Self::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.as_str()),
            Self::Authorization(msg) => (StatusCode::FORBIDDEN, msg.as_str()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.as_str()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.as_str()),
            Self::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, msg.as_str()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.as_str()),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (_, message) = self.status_and_message();
        write!(f, "{message}")
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref msg) = self {
            tracing::error!("internal error: {msg}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "message": "Internal server error" })),
            )
                .into_response();
        }
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                Self::Conflict("Resource already exists".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Authentication(format!("Invalid or expired token: {err}"))
    }
}

/// The uniform success envelope, `{success: true, message, data}`.
pub fn envelope<T: Serialize>(message: &str, data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}

/// Success envelope without a `data` payload.
pub fn ok_envelope(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message }))
}
