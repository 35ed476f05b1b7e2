//! C8 — Auth filter.
//!
//! Extracts and validates `Authorization: Bearer <jwt>`. A missing or
//! invalid token is not itself an error: the request proceeds with an
//! anonymous principal, and downstream handlers/C11 decide whether the
//! endpoint requires authentication. Generalizes the teacher's
//! `auth_middleware.rs`, which instead always rejected.

use crate::models::Role;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

#[derive(Debug, Clone)]
pub enum AuthPrincipal {
    Anonymous,
    Authenticated { username: String, roles: Vec<String> },
}

impl AuthPrincipal {
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::Authenticated { username, .. } => Some(username),
            Self::Anonymous => None,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        match self {
            Self::Authenticated { roles, .. } => roles.iter().any(|r| r == role.external_name()),
            Self::Anonymous => false,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

pub async fn auth_middleware(State(state): State<AppState>, mut req: Request<Body>, next: Next) -> Response {
    let principal = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .and_then(|token| state.tokens.verify_access_token(token).ok())
        .map(|claims| AuthPrincipal::Authenticated { username: claims.sub, roles: claims.roles })
        .unwrap_or(AuthPrincipal::Anonymous);

    req.extensions_mut().insert(principal);
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_roles() {
        let principal = AuthPrincipal::Anonymous;
        assert!(!principal.is_admin());
        assert_eq!(principal.username(), None);
    }

    #[test]
    fn authenticated_admin_recognized() {
        let principal = AuthPrincipal::Authenticated {
            username: "admin1".to_string(),
            roles: vec!["ADMIN".to_string()],
        };
        assert!(principal.is_admin());
        assert_eq!(principal.username(), Some("admin1"));
    }
}
