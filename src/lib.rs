pub mod api;
pub mod authz;
pub mod auth_middleware;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod coordination;
pub mod cors;
pub mod deck;
pub mod dispatcher;
pub mod error;
pub mod http_cache;
pub mod logging;
pub mod lock;
pub mod models;
pub mod queue;
pub mod rate_limit;
pub mod repo;
pub mod seed;
pub mod state;
pub mod telemetry;
pub mod tokens;
