use crate::auth_middleware::AuthPrincipal;
use crate::error::{envelope, ok_envelope, AppError, AppResult};
use crate::models::PrincipalPublic;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
    username: String,
    roles: Vec<String>,
    authenticated: bool,
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> AppResult<impl IntoResponse> {
    if body.username.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("username and password are required".to_string()));
    }

    let principal = state
        .principals
        .find_by_username(&body.username)
        .await?
        .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

    let issued = state.tokens.login(&principal, &body.password).await?;

    Ok(envelope(
        "Login successful",
        LoginResponse {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            username: principal.username.clone(),
            roles: vec![principal.role().external_name().to_string()],
            authenticated: true,
        },
    ))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
    #[serde(rename = "refreshToken")]
    refresh_token: String,
}

pub async fn refresh(State(state): State<AppState>, Json(body): Json<RefreshRequest>) -> AppResult<impl IntoResponse> {
    if body.refresh_token.trim().is_empty() {
        return Err(AppError::Validation("refreshToken is required".to_string()));
    }

    let issued = state.tokens.refresh(&body.refresh_token).await?;

    Ok(envelope(
        "Token refreshed",
        RefreshResponse { access_token: issued.access_token, refresh_token: issued.refresh_token },
    ))
}

pub async fn logout(State(state): State<AppState>, Json(body): Json<RefreshRequest>) -> AppResult<impl IntoResponse> {
    state.tokens.logout(&body.refresh_token).await?;
    Ok(ok_envelope("Logged out"))
}

#[derive(Debug, Serialize)]
struct GuestPrincipal {
    username: Option<String>,
    roles: Vec<String>,
    authenticated: bool,
}

pub async fn current_user(
    State(state): State<AppState>,
    Extension(principal): Extension<AuthPrincipal>,
) -> AppResult<impl IntoResponse> {
    match principal {
        AuthPrincipal::Authenticated { username, .. } => {
            let record = state
                .principals
                .find_by_username(&username)
                .await?
                .ok_or_else(|| AppError::Authentication("Principal no longer exists".to_string()))?;
            Ok(envelope("ok", PrincipalPublic::from(&record)))
        }
        AuthPrincipal::Anonymous => Ok(envelope(
            "ok",
            serde_json::to_value(GuestPrincipal { username: None, roles: vec![], authenticated: false })
                .unwrap_or_default(),
        )),
    }
}
