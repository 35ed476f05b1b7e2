//! C11 — Authorization policy.
//!
//! `canModify` governs deck update/delete/add-card/remove-card.
//! Catalog and archetype mutations bypass ownership entirely and
//! require `ADMIN` unconditionally.

use crate::auth_middleware::AuthPrincipal;
use crate::models::Role;

pub fn can_modify(resource_owner: &str, principal: &AuthPrincipal) -> bool {
    principal.is_admin() || principal.username() == Some(resource_owner)
}

pub fn require_admin(principal: &AuthPrincipal) -> bool {
    principal.has_role(Role::Admin)
}
