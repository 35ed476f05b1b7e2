use crate::models::Archetype;
use sqlx::PgPool;

#[derive(Clone)]
pub struct ArchetypeRepo {
    pool: PgPool,
}

impl ArchetypeRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_name_in(&self, names: &[String]) -> Result<Vec<Archetype>, sqlx::Error> {
        sqlx::query_as::<_, Archetype>("SELECT id, name FROM archetypes WHERE name = ANY($1)")
            .bind(names)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Archetype>, sqlx::Error> {
        sqlx::query_as::<_, Archetype>("SELECT id, name FROM archetypes WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<Archetype>, sqlx::Error> {
        sqlx::query_as::<_, Archetype>("SELECT id, name FROM archetypes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn insert_one(&self, name: &str) -> Result<Archetype, sqlx::Error> {
        sqlx::query_as::<_, Archetype>("INSERT INTO archetypes (id, name) VALUES (gen_random_uuid(), $1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn delete(&self, id: uuid::Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM archetypes WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_all(&self) -> Result<Vec<Archetype>, sqlx::Error> {
        sqlx::query_as::<_, Archetype>("SELECT id, name FROM archetypes ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }
}
