//! Administrative cache/queue/batch endpoints, all gated on `ADMIN`.

use crate::auth_middleware::AuthPrincipal;
use crate::authz;
use crate::error::{envelope, ok_envelope, AppError, AppResult};
use crate::queue::QueueMessage;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

fn require_admin(principal: &AuthPrincipal) -> AppResult<()> {
    if authz::require_admin(principal) {
        Ok(())
    } else {
        Err(AppError::Authorization("This operation requires an administrator".to_string()))
    }
}

pub async fn clear_cache(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    let removed = state.cache.evict_all().await?;
    Ok(envelope("Cache cleared", json!({ "evicted": removed })))
}

#[derive(Debug, Serialize)]
struct CacheStatsResponse {
    hits: u64,
    misses: u64,
    invalidations: u64,
    #[serde(rename = "hitRate")]
    hit_rate: f64,
}

pub async fn cache_stats(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    let stats = state.cache.stats();
    Ok(envelope(
        "ok",
        CacheStatsResponse { hits: stats.hits, misses: stats.misses, invalidations: stats.invalidations, hit_rate: stats.hit_rate() },
    ))
}

pub async fn warmup_cache(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    let catalog = state.catalog.clone();
    tokio::spawn(async move {
        if let Err(e) = catalog.warmup().await {
            tracing::error!("cache warm-up failed: {e:?}");
        }
    });
    Ok((StatusCode::ACCEPTED, ok_envelope("Warm-up scheduled")))
}

pub async fn batch_statistics(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    let total = state.catalog.count().await?;
    let stats = state.cache.stats();
    Ok(envelope(
        "ok",
        json!({
            "totalCards": total,
            "cacheHitRate": stats.hit_rate(),
        }),
    ))
}

pub async fn run_batch_job(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    let catalog = state.catalog.clone();
    tokio::spawn(async move {
        if let Err(e) = catalog.warmup().await {
            tracing::error!("batch job failed: {e:?}");
        }
    });
    Ok((StatusCode::ACCEPTED, ok_envelope("Batch job scheduled")))
}

pub async fn async_reload(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state.seeder.clone().spawn_async_reload();
    Ok((StatusCode::ACCEPTED, ok_envelope("Catalog reload scheduled")))
}

#[derive(Debug, Deserialize)]
pub struct PublishEventRequest {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub async fn publish_event(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<PublishEventRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state
        .queue
        .enqueue(crate::queue::CARD_OPERATIONS, QueueMessage::new(body.event_type, body.payload))
        .await?;
    Ok(ok_envelope("Event published"))
}

pub async fn notification_send(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<PublishEventRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state
        .queue
        .enqueue(crate::queue::NOTIFICATIONS, QueueMessage::new(body.event_type, body.payload))
        .await?;
    Ok(ok_envelope("Notification queued"))
}

#[derive(Debug, Deserialize)]
pub struct QueueSendRequest {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

pub async fn queue_send(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(queue_name): Path<String>,
    Json(body): Json<QueueSendRequest>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state.queue.enqueue(&queue_name, QueueMessage::new(body.message_type, body.payload)).await?;
    Ok(ok_envelope("Message enqueued"))
}

pub async fn queue_peek(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(queue_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    Ok(envelope("ok", state.queue.peek(&queue_name).await?))
}

pub async fn queue_size(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(queue_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    Ok(envelope("ok", json!({ "size": state.queue.len(&queue_name).await? })))
}

pub async fn queue_clear(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(queue_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state.queue.clear(&queue_name).await?;
    Ok(ok_envelope("Queue cleared"))
}
