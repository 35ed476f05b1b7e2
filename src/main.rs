use deckvault_core::cache::CacheNamespace;
use deckvault_core::catalog::CatalogService;
use deckvault_core::config::Config;
use deckvault_core::coordination::{CoordinationStore, RedisCoordinationStore};
use deckvault_core::cors::cors_layer_from_origins;
use deckvault_core::deck::DeckService;
use deckvault_core::dispatcher::Dispatcher;
use deckvault_core::lock::DistributedLock;
use deckvault_core::logging;
use deckvault_core::queue::WorkQueue;
use deckvault_core::rate_limit::RateLimiter;
use deckvault_core::repo::{ArchetypeRepo, CatalogRepo, DeckRepo, PrincipalRepo, RefreshTokenRepo};
use deckvault_core::seed::Seeder;
use deckvault_core::state::AppState;
use deckvault_core::tokens::TokenService;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_logging();

    let config = Config::from_env()?;
    deckvault_core::config::log_config(&config);

    let pool = PgPoolOptions::new()
        .max_connections(config.pool.max_connections)
        .min_connections(config.pool.min_connections)
        .acquire_timeout(Duration::from_secs(config.pool.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.pool.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.pool.max_lifetime_secs))
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;

    let coordination: Arc<dyn CoordinationStore> = Arc::new(RedisCoordinationStore::connect(&config.redis_url).await?);

    let cache = Arc::new(CacheNamespace::new(
        coordination.clone(),
        "cards",
        Duration::from_secs(config.cache_default_ttl_secs),
    ));
    let lock = Arc::new(DistributedLock::new(coordination.clone()));
    let rate_limiter = Arc::new(RateLimiter::new(coordination.clone()));
    let queue = Arc::new(WorkQueue::new(coordination.clone()));

    let catalog_repo = CatalogRepo::new(pool.clone());
    let archetype_repo = ArchetypeRepo::new(pool.clone());
    let deck_repo = DeckRepo::new(pool.clone());
    let principal_repo = PrincipalRepo::new(pool.clone());
    let refresh_token_repo = RefreshTokenRepo::new(pool.clone());

    let private_key = std::fs::read(&config.jwt_private_key_path)
        .map_err(|e| anyhow::anyhow!("failed to read JWT_PRIVATE_KEY_PATH: {e}"))?;
    let public_key = std::fs::read(&config.jwt_public_key_path)
        .map_err(|e| anyhow::anyhow!("failed to read JWT_PUBLIC_KEY_PATH: {e}"))?;

    let tokens = Arc::new(TokenService::new(
        &private_key,
        &public_key,
        config.jwt_access_ttl,
        config.jwt_refresh_ttl,
        refresh_token_repo,
        principal_repo.clone(),
    )?);

    let catalog = Arc::new(CatalogService::new(catalog_repo.clone(), archetype_repo.clone(), cache.clone(), queue.clone()));
    let deck = Arc::new(DeckService::new(deck_repo, catalog_repo, lock.clone()));
    let seeder = Arc::new(Seeder::new(catalog.clone(), config.upstream_catalog_url.clone()));

    if let Err(e) = seeder.seed_once().await {
        tracing::warn!("initial catalog seed failed, continuing with existing data: {e:?}");
    }

    let dispatcher = Arc::new(Dispatcher::new(queue.clone(), cache.clone()));
    tokio::spawn(dispatcher.run());

    let cleanup_tokens = tokens.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = cleanup_tokens.cleanup_expired().await {
                tracing::warn!("refresh token cleanup failed: {e:?}");
            }
        }
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        db: pool,
        coordination,
        cache,
        lock,
        rate_limiter,
        queue,
        tokens,
        catalog,
        deck,
        seeder,
        principals: principal_repo,
        archetypes: archetype_repo,
    };

    let cors = cors_layer_from_origins(&config.cors_allowed_origins);

    let app = deckvault_core::api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
