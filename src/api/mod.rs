pub mod admin;
pub mod archetypes;
pub mod auth;
pub mod cards;
pub mod decks;
pub mod dto;
pub mod users;

use crate::auth_middleware::auth_middleware;
use crate::rate_limit::rate_limit_middleware;
use crate::state::AppState;
use crate::telemetry::{health_check, timing_middleware};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user));

    let card_routes = Router::new()
        .route("/", get(cards::list_or_search).post(cards::create))
        .route("/by-name", get(cards::get_by_name_query))
        .route("/cache/clear", post(admin::clear_cache))
        .route("/cache/stats", get(admin::cache_stats))
        .route("/batch/warmup-cache", post(admin::warmup_cache))
        .route("/batch/statistics", post(admin::batch_statistics))
        .route("/run-batch-job", post(admin::run_batch_job))
        .route("/async-reload", post(admin::async_reload))
        .route("/publish-event", post(admin::publish_event))
        .route("/notification/send", post(admin::notification_send))
        .route("/queue/:queue/send", post(admin::queue_send))
        .route("/queue/:queue/peek", get(admin::queue_peek))
        .route("/queue/:queue/size", get(admin::queue_size))
        .route("/queue/:queue/clear", post(admin::queue_clear))
        .route(
            "/:name",
            get(cards::get_by_name_legacy).put(cards::update).patch(cards::patch).delete(cards::delete),
        );

    let archetype_routes =
        Router::new().route("/", get(archetypes::list)).route("/:id", get(archetypes::get));

    let deck_routes = Router::new()
        .route("/", get(decks::list).post(decks::create))
        .route("/:id", get(decks::get).put(decks::update).delete(decks::delete))
        .route("/:id/cards/:cardName", post(decks::add_card).delete(decks::remove_card));

    let user_routes = Router::new().route("/", get(users::list));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/cards", card_routes)
        .nest("/archetypes", archetype_routes)
        .nest("/decks", deck_routes)
        .nest("/users", user_routes);

    Router::new()
        .nest("/api", api)
        .route("/actuator/health", get(health_check))
        .route("/api/health", get(health_check))
        // Innermost first: rate limit needs the principal auth attaches,
        // and timing should wrap the whole request including both.
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(timing_middleware))
        .with_state(state)
}
