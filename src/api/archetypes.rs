use crate::error::{envelope, AppError, AppResult};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

pub async fn list(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let archetypes = state.archetypes.list_all().await?;
    Ok(envelope("ok", archetypes))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<impl IntoResponse> {
    let archetype = state
        .archetypes
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Archetype not found".to_string()))?;
    Ok(envelope("ok", archetype))
}
