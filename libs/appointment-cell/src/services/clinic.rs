// libs/appointment-cell/src/services/clinic.rs
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use batch_cell::{BatchError, BatchLookupService, BatchWorkPool, ShutdownReport, WorkerConfig};
use cache_cell::{AvailabilityCache, CacheStats, SubjectKind};
use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::{Appointment, AppointmentId, Doctor, DoctorId, PatientId};
use shared_utils::today;

use crate::models::AppointmentError;
use crate::services::booking::BookingCoordinator;

/// Everything callers need from the scheduling core, built once by the
/// composition root and shared behind an `Arc`.
pub struct ClinicService {
    store: Arc<dyn ClinicStore>,
    cache: Arc<AvailabilityCache>,
    coordinator: BookingCoordinator,
    batch: BatchLookupService,
}

impl ClinicService {
    pub fn new(
        store: Arc<dyn ClinicStore>,
        cache: Arc<AvailabilityCache>,
        pool: Arc<BatchWorkPool>,
    ) -> Self {
        Self {
            coordinator: BookingCoordinator::new(Arc::clone(&store), Arc::clone(&cache)),
            batch: BatchLookupService::new(pool, Arc::clone(&store)),
            store,
            cache,
        }
    }

    /// Build the cache and batch pool from configuration. Spawns the pool's
    /// workers, so it must run inside a tokio runtime.
    pub fn from_config(config: &AppConfig, store: Arc<dyn ClinicStore>) -> Self {
        let cache = Arc::new(AvailabilityCache::new(config.cache_ttl()));
        let pool = Arc::new(BatchWorkPool::start(WorkerConfig::from_app_config(config)));
        Self::new(store, cache, pool)
    }

    pub fn cache(&self) -> &Arc<AvailabilityCache> {
        &self.cache
    }

    // ==============================================================================
    // WRITES
    // ==============================================================================

    pub async fn book(
        &self,
        patient_id: PatientId,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<Appointment, AppointmentError> {
        self.coordinator.book(patient_id, doctor_id, date).await
    }

    pub async fn cancel(
        &self,
        appointment_id: AppointmentId,
        requesting_patient_id: PatientId,
    ) -> Result<bool, AppointmentError> {
        self.coordinator.cancel(appointment_id, requesting_patient_id).await
    }

    // ==============================================================================
    // READS
    // ==============================================================================

    pub async fn list_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = &self.store;
        let appointments = self
            .cache
            .get_or_load(SubjectKind::Patient, patient_id, || {
                store.list_appointments_by_patient(patient_id)
            })
            .await?;
        Ok(appointments)
    }

    pub async fn list_for_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = &self.store;
        let appointments = self
            .cache
            .get_or_load(SubjectKind::Doctor, doctor_id, || {
                store.list_appointments_by_doctor(doctor_id)
            })
            .await?;
        Ok(appointments)
    }

    /// Appointments strictly before today, most recent first.
    pub async fn past_appointments(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let cutoff = today();
        let mut past: Vec<Appointment> = self
            .list_for_patient(patient_id)
            .await?
            .into_iter()
            .filter(|a| a.is_before(cutoff))
            .collect();
        past.reverse();
        Ok(past)
    }

    /// Always asks the store; availability is never answered from the cache.
    pub async fn is_available(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<bool, AppointmentError> {
        Ok(self.store.is_doctor_available(doctor_id, date).await?)
    }

    /// All doctors, optionally narrowed to a specialization (case-insensitive
    /// substring). A blank filter means no filter.
    pub async fn list_doctors(
        &self,
        specialization: Option<&str>,
    ) -> Result<Vec<Doctor>, AppointmentError> {
        let doctors = self.store.list_doctors().await?;

        match specialization.map(str::trim).filter(|f| !f.is_empty()) {
            Some(filter) => {
                debug!("Filtering {} doctors by specialization {:?}", doctors.len(), filter);
                Ok(doctors
                    .into_iter()
                    .filter(|d| d.matches_specialization(filter))
                    .collect())
            }
            None => Ok(doctors),
        }
    }

    // ==============================================================================
    // BATCH
    // ==============================================================================

    pub async fn prefetch_appointments(
        &self,
        patient_ids: Vec<PatientId>,
    ) -> Result<HashMap<PatientId, Vec<Appointment>>, BatchError> {
        self.batch.prefetch_appointments(patient_ids).await
    }

    pub async fn check_availability(
        &self,
        doctor_ids: Vec<DoctorId>,
        date: NaiveDate,
    ) -> Result<HashMap<DoctorId, bool>, BatchError> {
        self.batch.check_availability(doctor_ids, date).await
    }

    // ==============================================================================
    // LIFECYCLE
    // ==============================================================================

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Drain the batch pool. Call once when the process is stopping.
    pub async fn shutdown(&self) -> ShutdownReport {
        info!("Shutting down clinic service");
        self.batch.pool().shutdown().await
    }
}
