// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use batch_cell::BatchError;
use shared_models::{AppError, Appointment, AppointmentId, DoctorId, PatientId};

use crate::models::{
    AvailabilityQuery, AvailabilityResponse, BatchAvailabilityRequest, BookAppointmentRequest,
    CancelAppointmentRequest, CancelAppointmentResponse, DoctorSearchQuery, PrefetchRequest,
};
use crate::services::ClinicService;

fn batch_error(e: BatchError) -> AppError {
    tracing::warn!("Batch request rejected: {}", e);
    AppError::Unavailable("Batch lookups are not available while the service is stopping".to_string())
}

// ==============================================================================
// BOOKING
// ==============================================================================

pub async fn book_appointment(
    State(service): State<Arc<ClinicService>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = service
        .book(request.patient_id, request.doctor_id, request.appointment_date)
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn cancel_appointment(
    State(service): State<Arc<ClinicService>>,
    Path(appointment_id): Path<AppointmentId>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<CancelAppointmentResponse>, AppError> {
    let cancelled = service.cancel(appointment_id, request.patient_id).await?;

    Ok(Json(CancelAppointmentResponse { appointment_id, cancelled }))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

pub async fn get_patient_appointments(
    State(service): State<Arc<ClinicService>>,
    Path(patient_id): Path<PatientId>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.list_for_patient(patient_id).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_patient_history(
    State(service): State<Arc<ClinicService>>,
    Path(patient_id): Path<PatientId>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.past_appointments(patient_id).await?;

    Ok(Json(json!({
        "patient_id": patient_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn get_doctor_appointments(
    State(service): State<Arc<ClinicService>>,
    Path(doctor_id): Path<DoctorId>,
) -> Result<Json<Value>, AppError> {
    let appointments = service.list_for_doctor(doctor_id).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "appointments": appointments,
        "total": appointments.len()
    })))
}

pub async fn check_doctor_availability(
    State(service): State<Arc<ClinicService>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available = service.is_available(query.doctor_id, query.date).await?;

    Ok(Json(AvailabilityResponse {
        doctor_id: query.doctor_id,
        date: query.date,
        available,
    }))
}

pub async fn list_doctors(
    State(service): State<Arc<ClinicService>>,
    Query(query): Query<DoctorSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let doctors = service.list_doctors(query.specialization.as_deref()).await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

// ==============================================================================
// BATCH
// ==============================================================================

pub async fn prefetch_appointments(
    State(service): State<Arc<ClinicService>>,
    Json(request): Json<PrefetchRequest>,
) -> Result<Json<Value>, AppError> {
    let requested = request.patient_ids.len();
    let prefetched = service
        .prefetch_appointments(request.patient_ids)
        .await
        .map_err(batch_error)?;

    Ok(Json(json!({
        "requested": requested,
        "appointments": prefetched
    })))
}

pub async fn check_batch_availability(
    State(service): State<Arc<ClinicService>>,
    Json(request): Json<BatchAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let availability = service
        .check_availability(request.doctor_ids, request.date)
        .await
        .map_err(batch_error)?;

    Ok(Json(json!({
        "date": request.date,
        "availability": availability
    })))
}
