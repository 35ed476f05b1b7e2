//! Repository layer — thin wrappers over `sqlx::query_as` against the
//! relational store, mirroring the teacher's `database.rs` pattern of
//! one struct per aggregate holding a cloned `PgPool`.

pub mod archetype_repo;
pub mod catalog_repo;
pub mod deck_repo;
pub mod principal_repo;
pub mod refresh_token_repo;

pub use archetype_repo::ArchetypeRepo;
pub use catalog_repo::CatalogRepo;
pub use deck_repo::DeckRepo;
pub use principal_repo::PrincipalRepo;
pub use refresh_token_repo::RefreshTokenRepo;
