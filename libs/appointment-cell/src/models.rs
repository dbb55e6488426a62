// libs/appointment-cell/src/models.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::{AppError, AppointmentId, DoctorId, PatientId};

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub patient_id: PatientId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentResponse {
    pub appointment_id: AppointmentId,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub doctor_id: DoctorId,
    pub date: NaiveDate,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefetchRequest {
    pub patient_ids: Vec<PatientId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchAvailabilityRequest {
    pub doctor_ids: Vec<DoctorId>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorSearchQuery {
    pub specialization: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    Conflict,
    Forbidden,
    InvalidState,
    StoreError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::InvalidInput => write!(f, "invalid_input"),
            ErrorKind::Conflict => write!(f, "conflict"),
            ErrorKind::Forbidden => write!(f, "forbidden"),
            ErrorKind::InvalidState => write!(f, "invalid_state"),
            ErrorKind::StoreError => write!(f, "store_error"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Patient {0} not found")]
    PatientNotFound(PatientId),

    #[error("Doctor {0} not found")]
    DoctorNotFound(DoctorId),

    #[error("Appointment {0} not found")]
    AppointmentNotFound(AppointmentId),

    #[error("Cannot book appointment in the past: {date}")]
    PastDate { date: NaiveDate },

    #[error("Doctor {doctor_id} is not available on {date}")]
    DoctorUnavailable { doctor_id: DoctorId, date: NaiveDate },

    #[error("Appointment {appointment_id} does not belong to patient {patient_id}")]
    NotOwner { appointment_id: AppointmentId, patient_id: PatientId },

    #[error("Cannot cancel past appointment {appointment_id} dated {date}")]
    PastAppointment { appointment_id: AppointmentId, date: NaiveDate },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AppointmentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppointmentError::PatientNotFound(_)
            | AppointmentError::DoctorNotFound(_)
            | AppointmentError::AppointmentNotFound(_) => ErrorKind::NotFound,
            AppointmentError::PastDate { .. } => ErrorKind::InvalidInput,
            AppointmentError::DoctorUnavailable { .. } => ErrorKind::Conflict,
            AppointmentError::NotOwner { .. } => ErrorKind::Forbidden,
            AppointmentError::PastAppointment { .. } => ErrorKind::InvalidState,
            AppointmentError::Store(_) => ErrorKind::StoreError,
        }
    }

    /// Message safe to show to a patient or doctor. Store details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            AppointmentError::PatientNotFound(_) => "Patient not found!".to_string(),
            AppointmentError::DoctorNotFound(_) => "Doctor not found!".to_string(),
            AppointmentError::AppointmentNotFound(_) => "Appointment not found!".to_string(),
            AppointmentError::PastDate { .. } => "Cannot book appointment in the past!".to_string(),
            AppointmentError::DoctorUnavailable { date, .. } => {
                format!("Doctor is not available on {}!", date)
            }
            AppointmentError::NotOwner { .. } => {
                "You can only cancel your own appointments!".to_string()
            }
            AppointmentError::PastAppointment { .. } => "Cannot cancel past appointments!".to_string(),
            AppointmentError::Store(_) => {
                "The clinic records are temporarily unavailable. Please try again.".to_string()
            }
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(e: AppointmentError) -> Self {
        if let AppointmentError::Store(inner) = &e {
            tracing::error!("Store failure behind appointment request: {}", inner);
        }

        let message = e.user_message();
        match e.kind() {
            ErrorKind::NotFound => AppError::NotFound(message),
            ErrorKind::InvalidInput => AppError::BadRequest(message),
            ErrorKind::Conflict => AppError::Conflict(message),
            ErrorKind::Forbidden => AppError::Forbidden(message),
            ErrorKind::InvalidState => AppError::InvalidState(message),
            ErrorKind::StoreError => AppError::Unavailable(message),
        }
    }
}
