use crate::models::Principal;
use sqlx::PgPool;

#[derive(Clone)]
pub struct PrincipalRepo {
    pool: PgPool,
}

impl PrincipalRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT id, username, password_hash, role, enabled FROM principals WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn list_all(&self) -> Result<Vec<Principal>, sqlx::Error> {
        sqlx::query_as::<_, Principal>(
            "SELECT id, username, password_hash, role, enabled FROM principals ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await
    }
}
