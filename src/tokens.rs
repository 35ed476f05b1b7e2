//! C7 — Token service.
//!
//! Access tokens are short-lived RS256 JWTs, signed with a private key
//! held only by this service and verifiable anywhere with the matching
//! public key. Refresh tokens are opaque UUID v4 identifiers persisted
//! in the relational store with their own state machine. Generalizes
//! the teacher's `auth.rs` (HS256, Redis-backed refresh storage) to an
//! asymmetric signature and a durable refresh-token table.

use crate::error::{AppError, AppResult};
use crate::models::{Principal, RefreshToken, RefreshTokenState, Role};
use crate::repo::{PrincipalRepo, RefreshTokenRepo};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: std::time::Duration,
    refresh_ttl: std::time::Duration,
    refresh_tokens: RefreshTokenRepo,
    principals: PrincipalRepo,
}

impl TokenService {
    pub fn new(
        private_key_pem: &[u8],
        public_key_pem: &[u8],
        access_ttl: std::time::Duration,
        refresh_ttl: std::time::Duration,
        refresh_tokens: RefreshTokenRepo,
        principals: PrincipalRepo,
    ) -> AppResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem)
            .map_err(|e| AppError::Internal(format!("invalid JWT private key: {e}")))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem)
            .map_err(|e| AppError::Internal(format!("invalid JWT public key: {e}")))?;
        Ok(Self { encoding_key, decoding_key, access_ttl, refresh_ttl, refresh_tokens, principals })
    }

    fn mint_access_token(&self, principal: &Principal) -> AppResult<String> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: principal.username.clone(),
            roles: vec![principal.role().external_name().to_string()],
            iat: now.timestamp(),
            exp: (now + ChronoDuration::from_std(self.access_ttl).unwrap_or_default()).timestamp(),
        };
        Ok(encode(&Header::new(jsonwebtoken::Algorithm::RS256), &claims, &self.encoding_key)?)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<AccessClaims> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;
        let data = decode::<AccessClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    pub async fn login(&self, principal: &Principal, password: &str) -> AppResult<IssuedTokens> {
        if !principal.enabled {
            return Err(AppError::Authentication("Account disabled".to_string()));
        }
        let valid = bcrypt::verify(password, &principal.password_hash)
            .map_err(|e| AppError::Internal(format!("bcrypt error: {e}")))?;
        if !valid {
            return Err(AppError::Authentication("Invalid username or password".to_string()));
        }

        let access_token = self.mint_access_token(principal)?;
        let refresh_token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + ChronoDuration::from_std(self.refresh_ttl).unwrap_or_default();
        self.refresh_tokens.insert(&refresh_token, &principal.username, expires_at).await?;

        Ok(IssuedTokens { access_token, refresh_token })
    }

    /// Validates the refresh token per the state machine and, on
    /// success, mints a fresh access token. The refresh token itself is
    /// retained (rotation is optional, not required by the invariant).
    pub async fn refresh(&self, token: &str) -> AppResult<IssuedTokens> {
        let record = self.load_active(token).await?;
        let principal = self
            .principals
            .find_by_username(&record.principal_ref)
            .await?
            .ok_or_else(|| AppError::Authentication("Principal no longer exists".to_string()))?;

        let access_token = self.mint_access_token(&principal)?;
        self.refresh_tokens.touch_last_used(token).await?;

        Ok(IssuedTokens { access_token, refresh_token: token.to_string() })
    }

    /// Idempotent: marking an already-revoked or already-expired token
    /// `Revoked` again is a harmless no-op that still returns success.
    pub async fn logout(&self, token: &str) -> AppResult<()> {
        self.refresh_tokens.mark_revoked(token).await?;
        Ok(())
    }

    pub async fn revoke_all(&self, username: &str) -> AppResult<u64> {
        Ok(self.refresh_tokens.revoke_all_for_principal(username).await?)
    }

    pub async fn cleanup_expired(&self) -> AppResult<u64> {
        Ok(self.refresh_tokens.delete_expired_or_revoked().await?)
    }

    async fn load_active(&self, token: &str) -> AppResult<RefreshToken> {
        let record = self
            .refresh_tokens
            .find(token)
            .await?
            .ok_or_else(|| AppError::Authentication("Unknown refresh token".to_string()))?;

        match record.state(Utc::now()) {
            RefreshTokenState::Active => Ok(record),
            RefreshTokenState::Revoked => Err(AppError::Authentication("Refresh token has been revoked".to_string())),
            RefreshTokenState::Expired => Err(AppError::Authentication("Refresh token has expired".to_string())),
        }
    }
}

pub fn normalize_external_role(raw: &str) -> String {
    Role::from_storage_name(raw).map_or_else(|| raw.to_string(), |r| r.external_name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_role_at_the_edge() {
        assert_eq!(normalize_external_role("ROLE_ADMIN"), "ADMIN");
        assert_eq!(normalize_external_role("ROLE_USER"), "USER");
    }

    // Login/refresh/logout/sign-verify coverage lives in tests/auth_flow.rs
    // against a real Postgres-backed RefreshTokenRepo and the checked-in
    // RSA test fixture under tests/fixtures/.
}
