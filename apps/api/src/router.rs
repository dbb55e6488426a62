use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, doctor_routes, ClinicService};
use cache_cell::cache_routes;

pub fn create_router(service: Arc<ClinicService>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic booking API is running!" }))
        .nest("/appointments", appointment_routes(Arc::clone(&service)))
        .nest("/doctors", doctor_routes(Arc::clone(&service)))
        .nest("/cache", cache_routes(Arc::clone(service.cache())))
}
