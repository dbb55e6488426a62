use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::{
    sort_by_date, Appointment, AppointmentId, Doctor, DoctorId, NewAppointment, Patient,
    PatientId,
};

use crate::store::{ClinicStore, StoreError};

#[derive(Default)]
struct MemoryState {
    patients: BTreeMap<PatientId, Patient>,
    doctors: BTreeMap<DoctorId, Doctor>,
    appointments: BTreeMap<AppointmentId, Appointment>,
    next_appointment_id: AppointmentId,
}

impl MemoryState {
    fn joined(&self, appointment: &Appointment) -> Appointment {
        appointment.clone().with_display(
            self.patients.get(&appointment.patient_id),
            self.doctors.get(&appointment.doctor_id),
        )
    }

    fn list_where<F>(&self, predicate: F) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut rows: Vec<Appointment> = self
            .appointments
            .values()
            .filter(|a| predicate(a))
            .map(|a| self.joined(a))
            .collect();
        sort_by_date(&mut rows);
        rows
    }
}

/// Process-local store used when no Supabase project is configured, and as
/// the backing store in tests.
///
/// An optional per-operation latency widens the window between a read and a
/// following write, which makes unsynchronized check-then-insert races easy to
/// reproduce.
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
    latency: Option<Duration>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState {
                next_appointment_id: 1,
                ..MemoryState::default()
            }),
            latency: None,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn add_patient(&self, patient: Patient) {
        self.state.write().await.patients.insert(patient.id, patient);
    }

    pub async fn add_doctor(&self, doctor: Doctor) {
        self.state.write().await.doctors.insert(doctor.id, doctor);
    }

    pub async fn appointment_count(&self) -> usize {
        self.state.read().await.appointments.len()
    }

    /// Every stored appointment for the doctor on the given date.
    pub async fn appointments_on(&self, doctor_id: DoctorId, date: NaiveDate) -> Vec<Appointment> {
        self.state
            .read()
            .await
            .list_where(|a| a.doctor_id == doctor_id && a.appointment_date == date)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.patients.get(&id).cloned())
    }

    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.doctors.get(&id).cloned())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.doctors.values().cloned().collect())
    }

    async fn is_doctor_available(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(!state
            .appointments
            .values()
            .any(|a| a.doctor_id == doctor_id && a.appointment_date == date))
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.write().await;
        let id = state.next_appointment_id;
        state.next_appointment_id += 1;

        let appointment = Appointment::from_new(id, new);
        state.appointments.insert(id, appointment.clone());
        debug!("Stored {}", appointment);
        Ok(appointment)
    }

    async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.write().await.appointments.remove(&id).is_some())
    }

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        self.simulate_latency().await;
        let state = self.state.read().await;
        Ok(state.appointments.get(&id).map(|a| state.joined(a)))
    }

    async fn list_appointments_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.list_where(|a| a.patient_id == patient_id))
    }

    async fn list_appointments_by_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.simulate_latency().await;
        Ok(self.state.read().await.list_where(|a| a.doctor_id == doctor_id))
    }
}
