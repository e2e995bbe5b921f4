use std::sync::Arc;

use axum::{Router, routing::get};

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod key_pool;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod rate_limit;
pub mod state;

use crate::state::AppState;

// Creating the router with routes. Only /api/weather sits behind the
// admission pipeline; health and metrics stay open for probes and scrapes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/api/weather", get(handlers::weather_handler))
        .with_state(state)
}
