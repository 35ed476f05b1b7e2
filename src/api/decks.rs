use crate::auth_middleware::AuthPrincipal;
use crate::error::{envelope, ok_envelope, AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn require_authenticated(principal: &AuthPrincipal) -> AppResult<String> {
    principal
        .username()
        .map(str::to_string)
        .ok_or_else(|| AppError::Authentication("Authentication required".to_string()))
}

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    Ok(envelope("ok", state.deck.list().await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<impl IntoResponse> {
    Ok(envelope("ok", state.deck.get(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateDeckRequest {
    pub name: String,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CreateDeckRequest>,
) -> AppResult<impl IntoResponse> {
    let owner = require_authenticated(&principal)?;
    if body.name.trim().is_empty() || body.name.len() > 100 {
        return Err(AppError::Validation("name must be 1-100 characters".to_string()));
    }

    let deck = state.deck.create(&body.name, &owner).await?;
    Ok((axum::http::StatusCode::CREATED, envelope("Deck created", deck)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeckRequest {
    pub name: String,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateDeckRequest>,
) -> AppResult<impl IntoResponse> {
    let deck = state.deck.update(id, &body.name, &principal).await?;
    Ok(envelope("Deck updated", deck))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    state.deck.delete(id, &principal).await?;
    Ok(ok_envelope("Deck deleted"))
}

#[derive(Debug, Serialize)]
struct CardCountResponse {
    size: i64,
    copies: i64,
}

pub async fn add_card(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path((id, card_name)): Path<(Uuid, String)>,
) -> AppResult<impl IntoResponse> {
    let result = state.deck.add_card(id, &card_name, &principal).await?;
    Ok(envelope("Card added", CardCountResponse { size: result.size, copies: result.copies }))
}

pub async fn remove_card(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path((id, card_name)): Path<(Uuid, String)>,
) -> AppResult<impl IntoResponse> {
    let result = state.deck.remove_card(id, &card_name, &principal).await?;
    Ok(envelope("Card removed", CardCountResponse { size: result.size, copies: result.copies }))
}
