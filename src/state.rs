//! Application state composition — wires every service together once
//! at startup, mirroring the teacher's minimal `AppState{db, ws_state}`
//! pattern but with the full service graph this spec requires.

use crate::cache::CacheNamespace;
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::coordination::CoordinationStore;
use crate::deck::DeckService;
use crate::lock::DistributedLock;
use crate::queue::WorkQueue;
use crate::rate_limit::RateLimiter;
use crate::repo::{ArchetypeRepo, PrincipalRepo};
use crate::seed::Seeder;
use crate::tokens::TokenService;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: PgPool,
    pub coordination: Arc<dyn CoordinationStore>,
    pub cache: Arc<CacheNamespace>,
    pub lock: Arc<DistributedLock>,
    pub rate_limiter: Arc<RateLimiter>,
    pub queue: Arc<WorkQueue>,
    pub tokens: Arc<TokenService>,
    pub catalog: Arc<CatalogService>,
    pub deck: Arc<DeckService>,
    pub seeder: Arc<Seeder>,
    pub principals: PrincipalRepo,
    pub archetypes: ArchetypeRepo,
}
