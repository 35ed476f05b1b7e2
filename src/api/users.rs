use crate::auth_middleware::AuthPrincipal;
use crate::authz;
use crate::error::{envelope, AppError, AppResult};
use crate::models::PrincipalPublic;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Extension};

pub async fn list(State(state): State<AppState>, Extension(principal): Extension<AuthPrincipal>) -> AppResult<impl IntoResponse> {
    if !authz::require_admin(&principal) {
        return Err(AppError::Authorization("Listing users requires an administrator".to_string()));
    }

    let principals = state.principals.list_all().await?;
    let public: Vec<PrincipalPublic> = principals.iter().map(PrincipalPublic::from).collect();
    Ok(envelope("ok", public))
}
