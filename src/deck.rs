//! C10 — Deck service. Transactional deck mutations guarded by the
//! distributed lock and the two domain invariants, `MAX_SIZE` and
//! `MAX_COPIES`, both re-checked inside the DB transaction regardless
//! of lock outcome.

use crate::auth_middleware::AuthPrincipal;
use crate::authz;
use crate::error::{AppError, AppResult};
use crate::lock::DistributedLock;
use crate::models::Deck;
use crate::repo::{CatalogRepo, DeckRepo};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const CREATE_DECK_LEASE: Duration = Duration::from_secs(10);
const DECK_LEASE: Duration = Duration::from_secs(5);

pub struct CardCountResult {
    pub size: i64,
    pub copies: i64,
}

pub struct DeckService {
    repo: DeckRepo,
    catalog: CatalogRepo,
    lock: Arc<DistributedLock>,
}

impl DeckService {
    pub fn new(repo: DeckRepo, catalog: CatalogRepo, lock: Arc<DistributedLock>) -> Self {
        Self { repo, catalog, lock }
    }

    /// Replaces control characters and angle brackets a naive XSS filter
    /// would otherwise catch; the real sanitizer is an external
    /// collaborator out of scope here.
    fn sanitize_name(raw: &str) -> String {
        raw.chars().filter(|c| !c.is_control()).collect::<String>().replace(['<', '>'], "")
    }

    pub async fn create(&self, name: &str, owner: &str) -> AppResult<Deck> {
        let lock_key = format!("user:{owner}:create_deck");
        if !self.lock.acquire(&lock_key, CREATE_DECK_LEASE).await {
            return Err(AppError::Conflict("Deck creation already in progress, try again".to_string()));
        }

        let result = self.repo.insert(&Self::sanitize_name(name), owner).await;
        self.lock.release(&lock_key).await;
        Ok(result?)
    }

    pub async fn update(&self, id: Uuid, new_name: &str, principal: &AuthPrincipal) -> AppResult<Deck> {
        let deck = self.load(id).await?;
        if !authz::can_modify(&deck.owner, principal) {
            return Err(AppError::Authorization("Only the owner or an admin can modify this deck".to_string()));
        }

        let lock_key = format!("deck:{id}");
        if !self.lock.acquire(&lock_key, DECK_LEASE).await {
            return Err(AppError::Conflict("Deck modification already in progress, try again".to_string()));
        }

        let result = self.repo.rename(id, &Self::sanitize_name(new_name)).await;
        self.lock.release(&lock_key).await;
        result?;

        self.load(id).await
    }

    pub async fn delete(&self, id: Uuid, principal: &AuthPrincipal) -> AppResult<()> {
        let deck = self.load(id).await?;
        if !authz::can_modify(&deck.owner, principal) {
            return Err(AppError::Authorization("Only the owner or an admin can modify this deck".to_string()));
        }

        let lock_key = format!("deck:{id}");
        if !self.lock.acquire(&lock_key, DECK_LEASE).await {
            return Err(AppError::Conflict("Deck modification already in progress, try again".to_string()));
        }

        let result = self.repo.delete(id).await;
        self.lock.release(&lock_key).await;
        result?;
        Ok(())
    }

    pub async fn add_card(&self, deck_id: Uuid, card_name: &str, principal: &AuthPrincipal) -> AppResult<CardCountResult> {
        let deck = self.load(deck_id).await?;
        if !authz::can_modify(&deck.owner, principal) {
            return Err(AppError::Authorization("Only the owner or an admin can modify this deck".to_string()));
        }
        if self.catalog.find_by_name(card_name).await?.is_none() {
            return Err(AppError::NotFound(format!("Card '{card_name}' not found")));
        }

        let lock_key = format!("deck:{deck_id}");
        if !self.lock.acquire(&lock_key, DECK_LEASE).await {
            return Err(AppError::Conflict("Deck modification already in progress, try again".to_string()));
        }

        let outcome = self.add_card_in_transaction(deck_id, card_name).await;
        self.lock.release(&lock_key).await;
        outcome
    }

    async fn add_card_in_transaction(&self, deck_id: Uuid, card_name: &str) -> AppResult<CardCountResult> {
        let mut tx = self.repo.begin().await?;
        self.repo.lock_deck(&mut tx, deck_id).await?;

        let size = self.repo.count_cards(&mut tx, deck_id).await?;
        if size >= Deck::MAX_SIZE as i64 {
            return Err(AppError::Validation(format!(
                "Deck has reached the maximum size of {} cards",
                Deck::MAX_SIZE
            )));
        }

        let copies = self.repo.count_copies(&mut tx, deck_id, card_name).await?;
        if copies >= Deck::MAX_COPIES as i64 {
            return Err(AppError::Validation(format!(
                "Deck already contains {} copies of '{card_name}'",
                Deck::MAX_COPIES
            )));
        }

        self.repo.append_card(&mut tx, deck_id, card_name).await?;
        tx.commit().await?;

        Ok(CardCountResult { size: size + 1, copies: copies + 1 })
    }

    /// Removes one occurrence (first match), no-op if absent.
    pub async fn remove_card(&self, deck_id: Uuid, card_name: &str, principal: &AuthPrincipal) -> AppResult<CardCountResult> {
        let deck = self.load(deck_id).await?;
        if !authz::can_modify(&deck.owner, principal) {
            return Err(AppError::Authorization("Only the owner or an admin can modify this deck".to_string()));
        }

        let lock_key = format!("deck:{deck_id}");
        if !self.lock.acquire(&lock_key, DECK_LEASE).await {
            return Err(AppError::Conflict("Deck modification already in progress, try again".to_string()));
        }

        let outcome = self.remove_card_in_transaction(deck_id, card_name).await;
        self.lock.release(&lock_key).await;
        outcome
    }

    async fn remove_card_in_transaction(&self, deck_id: Uuid, card_name: &str) -> AppResult<CardCountResult> {
        let mut tx = self.repo.begin().await?;
        self.repo.lock_deck(&mut tx, deck_id).await?;
        self.repo.remove_one_card(&mut tx, deck_id, card_name).await?;
        let size = self.repo.count_cards(&mut tx, deck_id).await?;
        let copies = self.repo.count_copies(&mut tx, deck_id, card_name).await?;
        tx.commit().await?;
        Ok(CardCountResult { size, copies })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Deck> {
        self.load(id).await
    }

    pub async fn list(&self) -> AppResult<Vec<Deck>> {
        Ok(self.repo.list_all().await?)
    }

    async fn load(&self, id: Uuid) -> AppResult<Deck> {
        self.repo.find_by_id(id).await?.ok_or_else(|| AppError::NotFound("Deck not found".to_string()))
    }
}
