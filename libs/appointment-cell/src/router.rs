// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::services::ClinicService;

pub fn appointment_routes(service: Arc<ClinicService>) -> Router {
    Router::new()
        // Writes, serialized by the booking coordinator
        .route("/", post(handlers::book_appointment))
        .route("/{appointment_id}/cancel", post(handlers::cancel_appointment))

        // Cached listings
        .route("/patients/{patient_id}", get(handlers::get_patient_appointments))
        .route("/patients/{patient_id}/history", get(handlers::get_patient_history))
        .route("/doctors/{doctor_id}", get(handlers::get_doctor_appointments))

        // Direct store lookups
        .route("/availability", get(handlers::check_doctor_availability))
        .route("/batch/prefetch", post(handlers::prefetch_appointments))
        .route("/batch/availability", post(handlers::check_batch_availability))

        .with_state(service)
}

pub fn doctor_routes(service: Arc<ClinicService>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .with_state(service)
}
