// libs/appointment-cell/src/services/booking.rs
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use cache_cell::AvailabilityCache;
use shared_database::ClinicStore;
use shared_models::{Appointment, AppointmentId, DoctorId, NewAppointment, PatientId};
use shared_utils::today;

use crate::models::AppointmentError;

/// Sole writer of appointment rows.
///
/// Every `book` and `cancel` runs inside one process-wide critical section, so
/// the availability check and the insert that follows it can never interleave
/// with another booking. Throughput is bounded by store latency, which is
/// acceptable for human-paced booking traffic. Finer locking (one mutex per
/// doctor or per doctor and date) or a unique constraint on
/// `(doctor_id, appointment_date)` in the store are the ways to lift that bound.
pub struct BookingCoordinator {
    store: Arc<dyn ClinicStore>,
    cache: Arc<AvailabilityCache>,
    critical_section: Mutex<()>,
}

impl BookingCoordinator {
    pub fn new(store: Arc<dyn ClinicStore>, cache: Arc<AvailabilityCache>) -> Self {
        Self {
            store,
            cache,
            critical_section: Mutex::new(()),
        }
    }

    /// Book `date` with the doctor for the patient.
    ///
    /// Checks run in a fixed order and stop at the first failure: patient
    /// exists, doctor exists, date is not before today, doctor is free that
    /// day. The cache is cleared only after a row has been inserted.
    #[instrument(skip(self))]
    pub async fn book(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment for patient {} with doctor {} on {}", patient_id, doctor_id, date);

        let _guard = self.critical_section.lock().await;

        if self.store.find_patient(patient_id).await?.is_none() {
            return Err(AppointmentError::PatientNotFound(patient_id));
        }

        if self.store.find_doctor(doctor_id).await?.is_none() {
            return Err(AppointmentError::DoctorNotFound(doctor_id));
        }

        if date < today() {
            return Err(AppointmentError::PastDate { date });
        }

        if !self.store.is_doctor_available(doctor_id, date).await? {
            warn!("Doctor {} already booked on {}", doctor_id, date);
            return Err(AppointmentError::DoctorUnavailable { doctor_id, date });
        }

        let appointment = self
            .store
            .insert_appointment(NewAppointment {
                patient_id,
                doctor_id,
                appointment_date: date,
            })
            .await?;

        self.cache.invalidate_all().await;

        info!("Booked {}", appointment);
        Ok(appointment)
    }

    /// Cancel an upcoming appointment on behalf of the patient who owns it.
    ///
    /// Returns `Ok(false)` when the row had already disappeared between the
    /// lookup and the delete; the cache is left alone in that case.
    #[instrument(skip(self))]
    pub async fn cancel(
        &self,
        appointment_id: AppointmentId,
        requesting_patient_id: PatientId,
    ) -> Result<bool, AppointmentError> {
        info!("Cancelling appointment {} for patient {}", appointment_id, requesting_patient_id);

        let _guard = self.critical_section.lock().await;

        let appointment = self
            .store
            .find_appointment(appointment_id)
            .await?
            .ok_or(AppointmentError::AppointmentNotFound(appointment_id))?;

        if appointment.patient_id != requesting_patient_id {
            warn!(
                "Patient {} tried to cancel appointment {} owned by patient {}",
                requesting_patient_id, appointment_id, appointment.patient_id
            );
            return Err(AppointmentError::NotOwner {
                appointment_id,
                patient_id: requesting_patient_id,
            });
        }

        if appointment.is_before(today()) {
            return Err(AppointmentError::PastAppointment {
                appointment_id,
                date: appointment.appointment_date,
            });
        }

        let removed = self.store.delete_appointment(appointment_id).await?;

        if removed {
            self.cache.invalidate_all().await;
            info!("Cancelled {}", appointment);
        } else {
            debug!("Appointment {} was already removed", appointment_id);
        }

        Ok(removed)
    }
}
