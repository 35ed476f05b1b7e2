use crate::models::Card;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CatalogRepo {
    pool: PgPool,
}

impl CatalogRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Joins in the archetype's name so callers (e.g. a PATCH that needs
    /// to preserve the existing archetype when the request omits it) have
    /// something to fall back to, not just the id.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<Card>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            "SELECT c.name, c.card_type, c.description, c.race, c.attribute, c.archetype_id, a.name AS archetype_name \
             FROM cards c LEFT JOIN archetypes a ON a.id = c.archetype_id WHERE c.name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
    }

    /// Case-insensitive ascending by `name`, deterministic collation via
    /// a secondary tie-break on the unique key itself.
    pub async fn find_all_sorted(&self, page: i64, size: i64) -> Result<Vec<Card>, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            "SELECT name, card_type, description, race, attribute, archetype_id FROM cards \
             ORDER BY LOWER(name) ASC, name ASC LIMIT $1 OFFSET $2",
        )
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn search(&self, query: &str, page: i64, size: i64) -> Result<Vec<Card>, sqlx::Error> {
        let pattern = format!("%{}%", query.to_lowercase());
        sqlx::query_as::<_, Card>(
            "SELECT c.name, c.card_type, c.description, c.race, c.attribute, c.archetype_id FROM cards c \
             LEFT JOIN archetypes a ON a.id = c.archetype_id \
             WHERE LOWER(c.name) LIKE $1 OR LOWER(a.name) LIKE $1 \
             ORDER BY LOWER(c.name) ASC, c.name ASC LIMIT $2 OFFSET $3",
        )
        .bind(&pattern)
        .bind(size)
        .bind(page * size)
        .fetch_all(&self.pool)
        .await
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards").fetch_one(&self.pool).await
    }

    pub async fn save(&self, card: &Card) -> Result<Card, sqlx::Error> {
        sqlx::query_as::<_, Card>(
            "INSERT INTO cards (name, card_type, description, race, attribute, archetype_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (name) DO UPDATE SET \
               card_type = EXCLUDED.card_type, description = EXCLUDED.description, \
               race = EXCLUDED.race, attribute = EXCLUDED.attribute, archetype_id = EXCLUDED.archetype_id \
             RETURNING name, card_type, description, race, attribute, archetype_id",
        )
        .bind(&card.name)
        .bind(&card.human_readable_card_type)
        .bind(&card.description)
        .bind(&card.race)
        .bind(&card.attribute)
        .bind(card.archetype_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn delete(&self, name: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM cards WHERE name = $1").bind(name).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists_in_any_deck(&self, name: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM deck_cards WHERE card_name = $1)")
            .bind(name)
            .fetch_one(&self.pool)
            .await
    }

    pub async fn count_by_archetype_id(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE archetype_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await
    }
}
