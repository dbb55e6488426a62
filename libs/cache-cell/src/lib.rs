// =====================================================================================
// CACHE CELL - APPOINTMENT LIST READ CACHE
// =====================================================================================

pub mod models;
pub mod handlers;
pub mod router;
pub mod services;

pub use models::*;
pub use router::cache_routes;
pub use services::AvailabilityCache;
