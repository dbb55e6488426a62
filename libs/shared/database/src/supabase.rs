use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use shared_config::AppConfig;
use shared_models::{
    Appointment, AppointmentId, Doctor, DoctorId, NewAppointment, Patient, PatientId,
};

use crate::store::{ClinicStore, StoreError};

const RETURN_REPRESENTATION: &str = "return=representation";
const APPOINTMENT_SELECT: &str =
    "id,patient_id,doctor_id,appointment_date,patients(name),doctors(name,specialization)";

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    bearer_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            bearer_key: config.supabase_bearer_key().to_string(),
        }
    }

    fn get_headers(&self, prefer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.bearer_key))?,
        );

        if let Some(prefer) = prefer {
            headers.insert("Prefer", HeaderValue::from_str(prefer)?);
        }

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            prefer: Option<&str>, body: Option<Value>)
                            -> Result<T>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let headers = self.get_headers(prefer)?;

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

// ==============================================================================
// POSTGREST ROW SHAPES
// ==============================================================================

#[derive(Debug, Deserialize)]
struct PatientName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DoctorSummary {
    name: String,
    specialization: String,
}

#[derive(Debug, Deserialize)]
struct AppointmentRow {
    id: AppointmentId,
    patient_id: PatientId,
    doctor_id: DoctorId,
    appointment_date: NaiveDate,
    #[serde(default)]
    patients: Option<PatientName>,
    #[serde(default)]
    doctors: Option<DoctorSummary>,
}

impl From<AppointmentRow> for Appointment {
    fn from(row: AppointmentRow) -> Self {
        Appointment {
            id: row.id,
            patient_id: row.patient_id,
            doctor_id: row.doctor_id,
            appointment_date: row.appointment_date,
            patient_name: row.patients.map(|p| p.name),
            doctor_name: row.doctors.as_ref().map(|d| d.name.clone()),
            doctor_specialization: row.doctors.map(|d| d.specialization),
        }
    }
}

/// `ClinicStore` backed by the Supabase REST API.
pub struct SupabaseStore {
    client: SupabaseClient,
}

impl SupabaseStore {
    pub fn new(config: &AppConfig) -> Self {
        Self { client: SupabaseClient::new(config) }
    }

    async fn get_rows<T>(&self, path: &str) -> Result<Vec<T>, StoreError>
    where T: DeserializeOwned {
        self.client
            .request::<Vec<T>>(Method::GET, path, None, None)
            .await
            .map_err(backend_error)
    }

    async fn list_appointments(&self, filter: &str) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?{}&select={}&order=appointment_date.asc,id.asc",
            filter, APPOINTMENT_SELECT
        );
        let rows: Vec<AppointmentRow> = self.get_rows(&path).await?;
        Ok(rows.into_iter().map(Appointment::from).collect())
    }
}

fn backend_error(e: anyhow::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl ClinicStore for SupabaseStore {
    async fn find_patient(&self, id: PatientId) -> Result<Option<Patient>, StoreError> {
        let path = format!("/rest/v1/patients?id=eq.{}&select=id,name,age,gender", id);
        let rows: Vec<Patient> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_doctor(&self, id: DoctorId) -> Result<Option<Doctor>, StoreError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id,name,specialization", id);
        let rows: Vec<Doctor> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_doctors(&self) -> Result<Vec<Doctor>, StoreError> {
        self.get_rows("/rest/v1/doctors?select=id,name,specialization&order=id.asc").await
    }

    async fn is_doctor_available(
        &self,
        doctor_id: DoctorId,
        date: NaiveDate,
    ) -> Result<bool, StoreError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&appointment_date=eq.{}&select=id&limit=1",
            doctor_id, date
        );
        let rows: Vec<Value> = self.get_rows(&path).await?;
        Ok(rows.is_empty())
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let body = json!({
            "patient_id": new.patient_id,
            "doctor_id": new.doctor_id,
            "appointment_date": new.appointment_date,
        });

        let rows: Vec<AppointmentRow> = self.client
            .request(Method::POST, "/rest/v1/appointments", Some(RETURN_REPRESENTATION), Some(body))
            .await
            .map_err(backend_error)?;

        rows.into_iter()
            .next()
            .map(Appointment::from)
            .ok_or_else(|| StoreError::Decode("insert returned no row".to_string()))
    }

    async fn delete_appointment(&self, id: AppointmentId) -> Result<bool, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self.client
            .request(Method::DELETE, &path, Some(RETURN_REPRESENTATION), None)
            .await
            .map_err(backend_error)?;
        Ok(!rows.is_empty())
    }

    async fn find_appointment(&self, id: AppointmentId) -> Result<Option<Appointment>, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select={}", id, APPOINTMENT_SELECT);
        let rows: Vec<AppointmentRow> = self.get_rows(&path).await?;
        Ok(rows.into_iter().next().map(Appointment::from))
    }

    async fn list_appointments_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.list_appointments(&format!("patient_id=eq.{}", patient_id)).await
    }

    async fn list_appointments_by_doctor(
        &self,
        doctor_id: DoctorId,
    ) -> Result<Vec<Appointment>, StoreError> {
        self.list_appointments(&format!("doctor_id=eq.{}", doctor_id)).await
    }
}
