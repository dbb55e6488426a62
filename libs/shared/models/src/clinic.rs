// libs/shared/models/src/clinic.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type PatientId = i64;
pub type DoctorId = i64;
pub type AppointmentId = i64;

// ==============================================================================
// PEOPLE
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub age: i32,
    pub gender: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub specialization: String,
}

impl Doctor {
    /// Case-insensitive substring match on the specialization.
    pub fn matches_specialization(&self, filter: &str) -> bool {
        self.specialization
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

/// An appointment that has not been persisted yet and therefore has no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub doctor_id: DoctorId,
    pub appointment_date: NaiveDate,
    // Display fields, only filled on read paths that join patients and doctors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_specialization: Option<String>,
}

impl Appointment {
    pub fn from_new(id: AppointmentId, new: NewAppointment) -> Self {
        Self {
            id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            appointment_date: new.appointment_date,
            patient_name: None,
            doctor_name: None,
            doctor_specialization: None,
        }
    }

    pub fn with_display(mut self, patient: Option<&Patient>, doctor: Option<&Doctor>) -> Self {
        self.patient_name = patient.map(|p| p.name.clone());
        self.doctor_name = doctor.map(|d| d.name.clone());
        self.doctor_specialization = doctor.map(|d| d.specialization.clone());
        self
    }

    pub fn is_before(&self, date: NaiveDate) -> bool {
        self.appointment_date < date
    }
}

impl fmt::Display for Appointment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "appointment {} (patient {}, doctor {}, {})",
            self.id, self.patient_id, self.doctor_id, self.appointment_date
        )
    }
}

/// Sort in place by date ascending, ties broken by id so listings are stable.
pub fn sort_by_date(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| {
        a.appointment_date
            .cmp(&b.appointment_date)
            .then(a.id.cmp(&b.id))
    });
}
