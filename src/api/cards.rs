use crate::api::dto::{paginate, PageQuery};
use crate::auth_middleware::AuthPrincipal;
use crate::authz;
use crate::catalog::{CardInput, DEFAULT_PAGE_SIZE};
use crate::error::{envelope, ok_envelope, AppError, AppResult};
use crate::http_cache::cached_json_response;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;

/// Catalog listing/search, with HTTP-level conditional caching layered
/// on top of the read-through cache namespace: a request that already
/// holds the current page's ETag gets a 304 without re-serializing the
/// page, but a write still evicts the namespace and changes the ETag.
pub async fn list_or_search(
    State(state): State<AppState>,
    Query(q): Query<PageQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let page = q.page.unwrap_or(0).max(0);
    let size = q.size.unwrap_or(DEFAULT_PAGE_SIZE);

    let items = match q.query.as_deref().filter(|v| !v.is_empty()) {
        Some(query) => state.catalog.search_page(query, page, size).await?,
        None => state.catalog.list_page(page, size).await?,
    };
    let total = state.catalog.count().await?;

    let body = json!({
        "success": true,
        "message": "ok",
        "data": paginate(items, page, size.clamp(1, 200), total),
    });
    let resource_key = format!("cards:list:page={page}:size={size}:query={:?}", q.query);
    let response = cached_json_response(&headers, &resource_key, &body, state.config.cache_default_ttl_secs as usize)?;
    Ok(response)
}

#[derive(Debug, Deserialize)]
pub struct ByNameQuery {
    pub name: String,
}

pub async fn get_by_name_query(State(state): State<AppState>, Query(q): Query<ByNameQuery>) -> AppResult<impl IntoResponse> {
    let card = state.catalog.get_by_name(&q.name).await?;
    Ok(envelope("ok", card))
}

/// Legacy path-variable endpoint. Known to be unreliable for names
/// containing `/` (e.g. "D/D") — both this and the `by-name` query
/// endpoint are kept, per the design notes.
pub async fn get_by_name_legacy(State(state): State<AppState>, Path(name): Path<String>) -> AppResult<impl IntoResponse> {
    let card = state.catalog.get_by_name(&name).await?;
    Ok(envelope("ok", card))
}

#[derive(Debug, Deserialize)]
pub struct CardPayload {
    pub name: String,
    #[serde(rename = "humanReadableCardType")]
    pub human_readable_card_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub archetype: Option<String>,
}

fn require_admin(principal: &AuthPrincipal) -> AppResult<()> {
    if authz::require_admin(principal) {
        Ok(())
    } else {
        Err(AppError::Authorization("Catalog mutations require an administrator".to_string()))
    }
}

pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Json(body): Json<CardPayload>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    if body.name.trim().is_empty() || body.name.len() > 255 {
        return Err(AppError::Validation("name must be 1-255 characters".to_string()));
    }

    let saved = state
        .catalog
        .save(CardInput {
            name: body.name,
            human_readable_card_type: body.human_readable_card_type,
            description: body.description,
            race: body.race,
            attribute: body.attribute,
            archetype_name: body.archetype,
        })
        .await?;

    Ok((axum::http::StatusCode::CREATED, envelope("Card created", saved)))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(name): Path<String>,
    Json(body): Json<CardPayload>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;

    let saved = state
        .catalog
        .save(CardInput {
            name,
            human_readable_card_type: body.human_readable_card_type,
            description: body.description,
            race: body.race,
            attribute: body.attribute,
            archetype_name: body.archetype,
        })
        .await?;

    Ok(envelope("Card updated", saved))
}

#[derive(Debug, Deserialize, Default)]
pub struct CardPatch {
    #[serde(rename = "humanReadableCardType")]
    pub human_readable_card_type: Option<String>,
    pub description: Option<String>,
    pub race: Option<String>,
    pub attribute: Option<String>,
    pub archetype: Option<String>,
}

pub async fn patch(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(name): Path<String>,
    Json(body): Json<CardPatch>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;

    let existing = state.catalog.get_by_name(&name).await?;
    let saved = state
        .catalog
        .save(CardInput {
            name,
            human_readable_card_type: body.human_readable_card_type.unwrap_or(existing.human_readable_card_type),
            description: body.description.or(existing.description),
            race: body.race.or(existing.race),
            attribute: body.attribute.or(existing.attribute),
            archetype_name: body.archetype.or(existing.archetype_name),
        })
        .await?;

    Ok(envelope("Card updated", saved))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    require_admin(&principal)?;
    state.catalog.delete(&name).await?;
    Ok(ok_envelope("Card deleted"))
}
