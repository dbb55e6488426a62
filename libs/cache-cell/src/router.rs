use axum::{routing::get, Router};
use std::sync::Arc;

use crate::handlers::get_cache_stats;
use crate::services::AvailabilityCache;

pub fn cache_routes(cache: Arc<AvailabilityCache>) -> Router {
    Router::new()
        .route("/stats", get(get_cache_stats))
        .with_state(cache)
}
