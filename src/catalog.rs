//! C9 — Catalog service. Composes the cache namespace over the catalog
//! repository and enforces archetype upsert + orphan cleanup.

use crate::cache::CacheNamespace;
use crate::error::{AppError, AppResult};
use crate::models::{Archetype, Card};
use crate::queue::{QueueMessage, WorkQueue, CARD_OPERATIONS, NOTIFICATIONS};
use crate::repo::{ArchetypeRepo, CatalogRepo};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 200;

/// Write-side shape; `archetype_name` is resolved to an id before persist.
#[derive(Debug, Clone)]
pub struct CardInput {
    pub name: String,
    pub human_readable_card_type: String,
    pub description: Option<String>,
    pub race: Option<String>,
    pub attribute: Option<String>,
    pub archetype_name: Option<String>,
}

pub struct CatalogService {
    repo: CatalogRepo,
    archetypes: ArchetypeRepo,
    cache: Arc<CacheNamespace>,
    queue: Arc<WorkQueue>,
}

impl CatalogService {
    pub fn new(repo: CatalogRepo, archetypes: ArchetypeRepo, cache: Arc<CacheNamespace>, queue: Arc<WorkQueue>) -> Self {
        Self { repo, archetypes, cache, queue }
    }

    pub async fn get_by_name(&self, name: &str) -> AppResult<Card> {
        let key = format!("name:{name}");
        let repo = &self.repo;
        let found: Option<Card> = self
            .cache
            .get_or_compute(&key, || async move { Ok(repo.find_by_name(name).await?) })
            .await?;
        found.ok_or_else(|| AppError::NotFound(format!("Card '{name}' not found")))
    }

    pub async fn list_page(&self, page: i64, size: i64) -> AppResult<Vec<Card>> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        let key = format!("page:{page}:size:{size}");
        let repo = &self.repo;
        Ok(self
            .cache
            .get_or_compute(&key, || async move { Ok(repo.find_all_sorted(page, size).await?) })
            .await?)
    }

    /// Not cached — the result space is too large for a coarse namespace.
    pub async fn search_page(&self, query: &str, page: i64, size: i64) -> AppResult<Vec<Card>> {
        let size = size.clamp(1, MAX_PAGE_SIZE);
        Ok(self.repo.search(query, page, size).await?)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let repo = &self.repo;
        Ok(self.cache.get_or_compute("count", || async move { Ok(repo.count().await?) }).await?)
    }

    pub async fn save(&self, input: CardInput) -> AppResult<Card> {
        let existed_before = self.repo.find_by_name(&input.name).await?.is_some();

        let archetype_id = match &input.archetype_name {
            Some(name) if !name.is_empty() => {
                let resolved = self.ensure_archetypes(std::slice::from_ref(name)).await?;
                resolved.get(name).map(|a| a.id)
            }
            _ => None,
        };

        let card = Card {
            name: input.name,
            human_readable_card_type: input.human_readable_card_type,
            description: input.description,
            race: input.race,
            attribute: input.attribute,
            archetype_id,
            archetype_name: None,
        };

        let saved = self.repo.save(&card).await?;
        self.cache.evict_all().await?;

        let message_type = if existed_before { "CARD_UPDATED" } else { "CARD_CREATED" };
        self.queue
            .enqueue(CARD_OPERATIONS, QueueMessage::new(message_type, json!({ "name": saved.name })))
            .await?;
        self.queue
            .enqueue(NOTIFICATIONS, QueueMessage::new("SYSTEM", json!({ "note": format!("card {} saved", saved.name) })))
            .await?;

        Ok(saved)
    }

    pub async fn delete(&self, name: &str) -> AppResult<()> {
        let card = self
            .repo
            .find_by_name(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Card '{name}' not found")))?;

        if self.repo.exists_in_any_deck(name).await? {
            return Err(AppError::Conflict("Cannot delete card: used in decks".to_string()));
        }

        let archetype_id = card.archetype_id;
        self.repo.delete(name).await?;
        self.cache.evict_all().await?;

        if let Some(archetype_id) = archetype_id {
            match self.repo.count_by_archetype_id(archetype_id).await {
                Ok(0) => {
                    if let Err(e) = self.archetypes.delete(archetype_id).await {
                        tracing::warn!("orphan archetype cleanup failed for {archetype_id}: {e}");
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("orphan archetype check failed for {archetype_id}: {e}"),
            }
        }

        self.queue.enqueue(CARD_OPERATIONS, QueueMessage::new("CARD_DELETED", json!({ "name": name }))).await?;
        Ok(())
    }

    /// Admin-triggered, idempotent. Run after `evictAll` to keep the hot
    /// set resident.
    pub async fn warmup(&self) -> AppResult<()> {
        self.count().await?;
        for page in 0..5 {
            self.list_page(page, DEFAULT_PAGE_SIZE).await?;
        }
        Ok(())
    }

    /// Resolves every name in `names` to its archetype row, creating it
    /// lazily on first reference. A concurrent writer's row is accepted
    /// as the winner rather than surfaced as an error.
    pub async fn ensure_archetypes(&self, names: &[String]) -> AppResult<HashMap<String, Archetype>> {
        let existing = self.archetypes.find_by_name_in(names).await?;
        let mut resolved: HashMap<String, Archetype> = existing.into_iter().map(|a| (a.name.clone(), a)).collect();

        for name in names {
            if resolved.contains_key(name) {
                continue;
            }
            match self.archetypes.insert_one(name).await {
                Ok(archetype) => {
                    resolved.insert(name.clone(), archetype);
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    let winner = self
                        .archetypes
                        .find_by_name(name)
                        .await?
                        .ok_or_else(|| AppError::Internal(format!("archetype '{name}' vanished after conflict")))?;
                    resolved.insert(name.clone(), winner);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(resolved)
    }
}
