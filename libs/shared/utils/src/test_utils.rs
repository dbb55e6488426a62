use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{ClinicStore, InMemoryStore, StoreError};
use shared_models::{
    Appointment, AppointmentId, Doctor, DoctorId, NewAppointment, Patient, PatientId,
};

use crate::clock::today;

pub struct TestConfig {
    pub cache_ttl_seconds: u64,
    pub batch_workers: usize,
    pub batch_shutdown_grace_seconds: u64,
    pub supabase_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 60,
            batch_workers: 3,
            batch_shutdown_grace_seconds: 1,
            supabase_url: String::new(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: String::new(),
            cache_ttl_seconds: self.cache_ttl_seconds,
            batch_workers: self.batch_workers,
            batch_shutdown_grace_seconds: self.batch_shutdown_grace_seconds,
            server_port: 0,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

// ==============================================================================
// DATES
// ==============================================================================

pub fn days_from_today(days: i64) -> NaiveDate {
    today() + ChronoDuration::days(days)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

// ==============================================================================
// SEEDED STORES
// ==============================================================================

/// Patients 1..=3 and doctors 5..=7.
pub async fn seed(store: &InMemoryStore) {
    for (id, name, age, gender) in [
        (1, "Ama Owusu", 34, "F"),
        (2, "Kofi Boateng", 51, "M"),
        (3, "Esi Addo", 27, "F"),
    ] {
        store
            .add_patient(Patient { id, name: name.to_string(), age, gender: gender.to_string() })
            .await;
    }

    for (id, name, specialization) in [
        (5, "Dr. Mensah", "Cardiology"),
        (6, "Dr. Asante", "Dermatology"),
        (7, "Dr. Ofori", "Pediatric Cardiology"),
    ] {
        store
            .add_doctor(Doctor { id, name: name.to_string(), specialization: specialization.to_string() })
            .await;
    }
}

pub async fn seeded_store() -> Arc<InMemoryStore> {
    let store = InMemoryStore::new();
    seed(&store).await;
    Arc::new(store)
}

pub async fn seeded_store_with_latency(latency: Duration) -> Arc<InMemoryStore> {
    let store = InMemoryStore::new().with_latency(latency);
    seed(&store).await;
    Arc::new(store)
}

// ==============================================================================
// FAULT INJECTION
// ==============================================================================

/// Wraps a store, failing lookups for chosen ids and counting calls.
pub struct FaultyStore {
    inner: Arc<dyn ClinicStore>,
    failing_doctors: HashSet<DoctorId>,
    failing_patients: HashSet<PatientId>,
    panicking_doctors: HashSet<DoctorId>,
    deletes_find_nothing: bool,
    pub insert_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(inner: Arc<dyn ClinicStore>) -> Self {
        Self {
            inner,
            failing_doctors: HashSet::new(),
            failing_patients: HashSet::new(),
            panicking_doctors: HashSet::new(),
            deletes_find_nothing: false,
            insert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_doctor(mut self, id: DoctorId) -> Self {
        self.failing_doctors.insert(id);
        self
    }

    pub fn failing_patient(mut self, id: PatientId) -> Self {
        self.failing_patients.insert(id);
        self
    }

    pub fn panicking_doctor(mut self, id: DoctorId) -> Self {
        self.panicking_doctors.insert(id);
        self
    }

    /// Deletes report that no row was removed, as if another caller got there first.
    pub fn deletes_find_nothing(mut self) -> Self {
        self.deletes_find_nothing = true;
        self
    }

    pub fn inserts(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_doctor(&self, id: DoctorId) -> Result<(), StoreError> {
        if self.panicking_doctors.contains(&id) {
            debug!("Injecting panic for doctor {}", id);
            panic!("injected panic for doctor {}", id);
        }
        if self.failing_doctors.contains(&id) {
            debug!("Injecting store failure for doctor {}", id);
            return Err(StoreError::Unavailable(format!("injected failure for doctor {}", id)));
        }
        Ok(())
    }

    fn check_patient(&self, id: PatientId) -> Result<(), StoreError> {
        if self.failing_patients.contains(&id) {
            debug!("Injecting store failure for patient {}", id);
            return Err(StoreError::Unavailable(format!("injected failure for patient {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ClinicStore for FaultyStore {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, StoreError> {
        self.check_patient(id)?;
        self.inner.find_patient(id).await
    }

    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StoreError> {
        self.check_doctor(id)?;
        self.inner.find_doctor(id).await
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.inner.list_doctors().await
    }

    async fn is_doctor_available(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.check_doctor(doctor_id)?;
        self.inner.is_doctor_available(doctor_id, date).await
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_appointment(new).await
    }

    async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.deletes_find_nothing {
            debug!("Injecting empty delete for appointment {}", id);
            return Ok(false);
        }
        self.inner.delete_appointment(id).await
    }

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        self.inner.find_appointment(id).await
    }

    async fn list_appointments_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_patient(patient_id)?;
        self.inner.list_appointments_by_patient(patient_id).await
    }

    async fn list_appointments_by_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_doctor(doctor_id)?;
        self.inner.list_appointments_by_doctor(doctor_id).await
    }
}

// ==============================================================================
// MOCK SUPABASE PAYLOADS
// ==============================================================================

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn patient_response(id: PatientId, name: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "age": 40,
            "gender": "F"
        })
    }

    pub fn doctor_response(id: DoctorId, name: &str, specialization: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialization": specialization
        })
    }

    pub fn appointment_response(
        id: AppointmentId,
        patient_id: PatientId,
        doctor_id: DoctorId,
        appointment_date: &str,
    ) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_date": appointment_date,
            "patients": { "name": "Test Patient" },
            "doctors": { "name": "Dr. Test", "specialization": "General Practice" }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn faulty_store_fails_only_selected_ids() {
        let store = seeded_store().await;
        let faulty = FaultyStore::new(store).failing_doctor(6);

        assert!(faulty.is_doctor_available(5, days_from_today(3)).await.unwrap());
        assert_matches!(
            faulty.is_doctor_available(6, days_from_today(3)).await,
            Err(StoreError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn faulty_store_counts_inserts() {
        let faulty = FaultyStore::new(seeded_store().await);
        faulty
            .insert_appointment(NewAppointment { patient_id: 1, doctor_id: 5, appointment_date: days_from_today(1) })
            .await
            .unwrap();
        assert_eq!(faulty.inserts(), 1);
    }
}
