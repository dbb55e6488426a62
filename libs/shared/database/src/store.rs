use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use shared_models::{
    Appointment, AppointmentId, Doctor, DoctorId, NewAppointment, Patient, PatientId,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Backend(String),

    #[error("Store returned malformed data: {0}")]
    Decode(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence boundary for patients, doctors and appointments.
///
/// Appointment listings are ordered by date ascending and carry the joined
/// patient name, doctor name and doctor specialization. The store does not
/// enforce the one-appointment-per-doctor-per-date rule; callers that need it
/// must serialize their availability check and insert.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, StoreError>;

    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StoreError>;

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError>;

    /// `true` when the doctor has no appointment on `date`.
    async fn is_doctor_available(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<bool, StoreError>;

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError>;

    /// Returns whether a row was removed.
    async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, StoreError>;

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError>;

    async fn list_appointments_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn list_appointments_by_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, StoreError>;
}
