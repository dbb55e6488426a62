use axum::{extract::State, Json};
use std::sync::Arc;

use crate::models::CacheStats;
use crate::services::AvailabilityCache;

pub async fn get_cache_stats(
    State(cache): State<Arc<AvailabilityCache>>,
) -> Json<CacheStats> {
    Json(cache.stats().await)
}
