use axum::Router;
use std::sync::Arc;
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod domains;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod services;
pub mod state;

use api::create_api_router;
use observability::monitoring_router;
use state::AppState;

pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        // Monitoring endpoints (no authentication)
        .merge(monitoring_router())
        // API endpoints
        .merge(create_api_router())
        .with_state(app_state)
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .compress_when(SizeAbove::new(1024)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
