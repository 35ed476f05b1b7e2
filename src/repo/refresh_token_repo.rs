use crate::models::RefreshToken;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Clone)]
pub struct RefreshTokenRepo {
    pool: PgPool,
}

impl RefreshTokenRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, token: &str, principal_ref: &str, expires_at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token, principal_ref, created_at, expires_at, last_used_at, revoked) \
             VALUES ($1, $2, now(), $3, NULL, false)",
        )
        .bind(token)
        .bind(principal_ref)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find(&self, token: &str) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT token, principal_ref, created_at, expires_at, last_used_at, revoked \
             FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn mark_revoked(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn revoke_all_for_principal(&self, principal_ref: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE principal_ref = $1 AND revoked = false")
            .bind(principal_ref)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn touch_last_used(&self, token: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE refresh_tokens SET last_used_at = now() WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Periodic bulk delete of terminal-state rows (§4.7 `cleanupExpired`).
    pub async fn delete_expired_or_revoked(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE revoked = true OR expires_at < now()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
