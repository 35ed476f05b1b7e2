use crate::models::Deck;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct DeckRow {
    id: Uuid,
    name: String,
    owner: String,
}

#[derive(Clone)]
pub struct DeckRepo {
    pool: PgPool,
}

impl DeckRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Deck>, sqlx::Error> {
        let row = sqlx::query_as::<_, DeckRow>("SELECT id, name, owner FROM decks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else { return Ok(None) };
        let cards = self.load_cards(id).await?;
        Ok(Some(Deck { id: row.id, name: row.name, owner: row.owner, cards }))
    }

    pub async fn list_all(&self) -> Result<Vec<Deck>, sqlx::Error> {
        let rows = sqlx::query_as::<_, DeckRow>("SELECT id, name, owner FROM decks ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            let cards = self.load_cards(row.id).await?;
            decks.push(Deck { id: row.id, name: row.name, owner: row.owner, cards });
        }
        Ok(decks)
    }

    async fn load_cards(&self, deck_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT card_name FROM deck_cards WHERE deck_id = $1 ORDER BY position ASC")
            .bind(deck_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn insert(&self, name: &str, owner: &str) -> Result<Deck, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO decks (id, name, owner) VALUES (gen_random_uuid(), $1, $2) RETURNING id",
        )
        .bind(name)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;
        Ok(Deck { id, name: name.to_string(), owner: owner.to_string(), cards: Vec::new() })
    }

    pub async fn rename(&self, id: Uuid, name: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE decks SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM decks WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    /// Appends one occurrence within a caller-managed transaction. The
    /// `position` column preserves insertion order for deterministic
    /// `removeCard` first-match semantics.
    pub async fn append_card(&self, tx: &mut sqlx::PgConnection, deck_id: Uuid, card_name: &str) -> Result<(), sqlx::Error> {
        let next_position: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM deck_cards WHERE deck_id = $1",
        )
        .bind(deck_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query("INSERT INTO deck_cards (deck_id, card_name, position) VALUES ($1, $2, $3)")
            .bind(deck_id)
            .bind(card_name)
            .bind(next_position)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    /// Removes the first (lowest-position) occurrence, no-op if absent.
    pub async fn remove_one_card(&self, tx: &mut sqlx::PgConnection, deck_id: Uuid, card_name: &str) -> Result<bool, sqlx::Error> {
        let row_id: Option<i64> = sqlx::query_scalar(
            "SELECT position FROM deck_cards WHERE deck_id = $1 AND card_name = $2 ORDER BY position ASC LIMIT 1",
        )
        .bind(deck_id)
        .bind(card_name)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(position) = row_id else { return Ok(false) };
        sqlx::query("DELETE FROM deck_cards WHERE deck_id = $1 AND position = $2")
            .bind(deck_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        Ok(true)
    }

    /// Locks the deck row for the lifetime of the caller's transaction so
    /// concurrent `addCard`/`removeCard` transactions on the same deck
    /// serialize at the database level, independent of the coordination
    /// lock's outcome (held, stolen, or failed open).
    pub async fn lock_deck(&self, tx: &mut sqlx::PgConnection, deck_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM decks WHERE id = $1 FOR UPDATE")
            .bind(deck_id)
            .fetch_one(&mut *tx)
            .await?;
        Ok(())
    }

    pub async fn count_cards(&self, tx: &mut sqlx::PgConnection, deck_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM deck_cards WHERE deck_id = $1")
            .bind(deck_id)
            .fetch_one(&mut *tx)
            .await
    }

    pub async fn count_copies(&self, tx: &mut sqlx::PgConnection, deck_id: Uuid, card_name: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM deck_cards WHERE deck_id = $1 AND card_name = $2")
            .bind(deck_id)
            .bind(card_name)
            .fetch_one(&mut *tx)
            .await
    }

    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Postgres>, sqlx::Error> {
        self.pool.begin().await
    }
}
