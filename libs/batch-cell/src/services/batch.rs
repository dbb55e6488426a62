use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use shared_database::ClinicStore;
use shared_models::{Appointment, DoctorId, PatientId};

use crate::services::worker::BatchWorkPool;
use crate::BatchError;

/// Best-effort lookups fanned out across the batch pool.
///
/// Both operations go straight to the store and never consult or populate the
/// appointment cache. The only error they surface is a pool that has already
/// been shut down.
pub struct BatchLookupService {
    pool: Arc<BatchWorkPool>,
    store: Arc<dyn ClinicStore>,
}

impl BatchLookupService {
    pub fn new(pool: Arc<BatchWorkPool>, store: Arc<dyn ClinicStore>) -> Self {
        Self { pool, store }
    }

    pub fn pool(&self) -> &Arc<BatchWorkPool> {
        &self.pool
    }

    /// Appointment lists for every patient whose lookup succeeded. Failed ids
    /// are left out of the map.
    #[instrument(skip(self, patient_ids), fields(count = patient_ids.len()))]
    pub async fn prefetch_appointments(
        &self,
        patient_ids: Vec<PatientId>,
    ) -> Result<HashMap<PatientId, Vec<Appointment>>, BatchError> {
        let store = Arc::clone(&self.store);
        let results = self
            .pool
            .run_keyed(dedup(patient_ids), move |&patient_id| {
                let store = Arc::clone(&store);
                async move { store.list_appointments_by_patient(patient_id).await }
            })
            .await?;

        let mut prefetched = HashMap::with_capacity(results.len());
        for (patient_id, outcome) in results {
            match outcome {
                Ok(Ok(appointments)) => {
                    prefetched.insert(patient_id, appointments);
                }
                Ok(Err(e)) => {
                    warn!("Error fetching appointments for patient {}: {}", patient_id, e);
                }
                Err(e) => {
                    warn!("Prefetch task for patient {} failed: {}", patient_id, e);
                }
            }
        }

        debug!("Prefetched appointments for {} patients", prefetched.len());
        Ok(prefetched)
    }

    /// Availability of each doctor on `date`. Every requested id gets an
    /// entry; a failed lookup is reported as unavailable.
    #[instrument(skip(self, doctor_ids), fields(count = doctor_ids.len()))]
    pub async fn check_availability(
        &self,
        doctor_ids: Vec<DoctorId>,
        date: NaiveDate,
    ) -> Result<HashMap<DoctorId, bool>, BatchError> {
        let store = Arc::clone(&self.store);
        let results = self
            .pool
            .run_keyed(dedup(doctor_ids), move |&doctor_id| {
                let store = Arc::clone(&store);
                async move { store.is_doctor_available(doctor_id, date).await }
            })
            .await?;

        let availability = results
            .into_iter()
            .map(|(doctor_id, outcome)| {
                let available = match outcome {
                    Ok(Ok(available)) => available,
                    Ok(Err(e)) => {
                        warn!("Error checking availability for doctor {}: {}", doctor_id, e);
                        false
                    }
                    Err(e) => {
                        warn!("Availability task for doctor {} failed: {}", doctor_id, e);
                        false
                    }
                };
                (doctor_id, available)
            })
            .collect();

        Ok(availability)
    }
}

fn dedup<K: Copy + Eq + Hash>(ids: Vec<K>) -> Vec<K> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
