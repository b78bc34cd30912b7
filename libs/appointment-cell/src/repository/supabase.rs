// libs/appointment-cell/src/repository/supabase.rs
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{DoctorProfile, OperatingHours};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    Appointment, AppointmentError, AppointmentLog, AppointmentSearchQuery, NewAppointment,
    ReminderKind,
};
use crate::repository::{AppointmentRepository, TransitionChange};

/// Longest appointment the overlap prefilter has to account for. The precise
/// overlap check happens in memory against each row's actual duration.
const MAX_APPOINTMENT_MINUTES: i64 = 240;

/// PostgREST-backed record store. Built per request so row-level security
/// sees the caller's own bearer token; atomic multi-row writes (status +
/// audit log) go through SQL functions exposed under /rest/v1/rpc.
pub struct SupabaseAppointmentRepository {
    supabase: SupabaseClient,
    auth_token: String,
}

impl SupabaseAppointmentRepository {
    pub fn new(config: &AppConfig, auth_token: impl Into<String>) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            auth_token: auth_token.into(),
        }
    }

    fn token(&self) -> Option<&str> {
        Some(self.auth_token.as_str())
    }

    fn parse_rows<T: serde::de::DeserializeOwned>(
        rows: Vec<Value>,
    ) -> Result<Vec<T>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse rows: {}", e)))
    }

    fn first_or_not_found(rows: Vec<Value>) -> Result<Appointment, AppointmentError> {
        let row = rows.into_iter().next().ok_or(AppointmentError::NotFound)?;
        serde_json::from_value(row).map_err(|e| {
            AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e))
        })
    }
}

#[async_trait]
impl AppointmentRepository for SupabaseAppointmentRepository {
    async fn fetch(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", id);

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::first_or_not_found(result)
    }

    async fn search(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = query.status {
            query_parts.push(format!("status=eq.{}", status));
        }
        if let Some(modality) = query.modality {
            query_parts.push(format!("modality=eq.{}", modality));
        }
        if let Some(from_date) = query.from_date {
            let encoded = urlencoding::encode(&from_date.to_rfc3339()).into_owned();
            query_parts.push(format!("appointment_date=gte.{}", encoded));
        }
        if let Some(to_date) = query.to_date {
            let encoded = urlencoding::encode(&to_date.to_rfc3339()).into_owned();
            query_parts.push(format!("appointment_date=lte.{}", encoded));
        }
        query_parts.push(format!("limit={}", query.limit.unwrap_or(50)));
        query_parts.push(format!("offset={}", query.offset.unwrap_or(0)));

        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_rows(result)
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        // Prefilter on the start column; rows starting earlier than the
        // longest possible appointment cannot reach into the window.
        let earliest_start = start - Duration::minutes(MAX_APPOINTMENT_MINUTES);

        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            "status=in.(pending,scheduled,in_progress)".to_string(),
            format!(
                "appointment_date=gte.{}",
                urlencoding::encode(&earliest_start.to_rfc3339())
            ),
            format!(
                "appointment_date=lt.{}",
                urlencoding::encode(&end.to_rfc3339())
            ),
        ];

        if let Some(exclude_id) = exclude {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let path = format!(
            "/rest/v1/appointments?{}&order=appointment_date.asc",
            query_parts.join("&")
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let candidates: Vec<Appointment> = Self::parse_rows(result)?;

        Ok(candidates
            .into_iter()
            .filter(|apt| apt.appointment_date < end && apt.scheduled_end_time() > start)
            .collect())
    }

    async fn insert(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        debug!(
            "Inserting appointment for patient {} with doctor {}",
            new.patient_id, new.doctor_id
        );

        // SQL function inserts the appointment and its initial log row in
        // one transaction.
        let result: Vec<Value> = self
            .supabase
            .rpc(
                "create_appointment",
                self.token(),
                json!({
                    "p_patient_id": new.patient_id,
                    "p_doctor_id": new.doctor_id,
                    "p_modality": new.modality.to_string(),
                    "p_appointment_date": new.appointment_date.to_rfc3339(),
                    "p_duration_minutes": new.duration_minutes,
                    "p_status": new.status.to_string(),
                    "p_notes": new.notes,
                }),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::first_or_not_found(result)
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        change: TransitionChange,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Applying transition of {} to {}", id, change.new_status);

        // Status update and log append commit together inside the function.
        let result: Vec<Value> = self
            .supabase
            .rpc(
                "transition_appointment",
                self.token(),
                json!({
                    "p_appointment_id": id,
                    "p_new_status": change.new_status.to_string(),
                    "p_new_date": change.new_date.map(|d| d.to_rfc3339()),
                    "p_new_duration_minutes": change.new_duration_minutes,
                    "p_note": change.note,
                }),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::first_or_not_found(result)
    }

    async fn mark_missed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, AppointmentError> {
        debug!("Marking appointments missed before {}", cutoff);

        // Single conditional UPDATE ... RETURNING plus log inserts in one
        // transaction, so the check-and-set cannot race a concurrent
        // completion.
        let result: Vec<Uuid> = self
            .supabase
            .rpc(
                "mark_missed_appointments",
                self.token(),
                json!({ "p_cutoff": cutoff.to_rfc3339() }),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(result)
    }

    async fn reminder_candidates(
        &self,
        kind: ReminderKind,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?status=eq.scheduled&appointment_date=gte.{}&appointment_date=lte.{}&{}=is.null&order=appointment_date.asc",
            urlencoding::encode(&window_start.to_rfc3339()),
            urlencoding::encode(&window_end.to_rfc3339()),
            kind.sentinel_column(),
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_rows(result)
    }

    async fn claim_reminder(
        &self,
        id: Uuid,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        // Conditional PATCH: the is.null filter means only one concurrent
        // sweep gets a row back.
        let path = format!(
            "/rest/v1/appointments?id=eq.{}&{}=is.null",
            id,
            kind.sentinel_column()
        );

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                self.token(),
                Some(json!({ kind.sentinel_column(): now.to_rfc3339() })),
                Some(headers),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Ok(!result.is_empty())
    }

    async fn operating_hours(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<OperatingHours>, AppointmentError> {
        let path = format!(
            "/rest/v1/doctor_operating_hours?doctor_id=eq.{}&day_of_week=eq.{}",
            doctor_id, day_of_week
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let hours: Vec<OperatingHours> = Self::parse_rows(result)?;
        Ok(hours.into_iter().next())
    }

    async fn doctor_default_duration(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<i32>, AppointmentError> {
        let path = format!(
            "/rest/v1/doctors?id=eq.{}&select=id,default_duration_minutes",
            doctor_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let profiles: Vec<DoctorProfile> = Self::parse_rows(result)?;
        Ok(profiles.into_iter().next().map(|p| p.default_duration_minutes))
    }

    async fn logs_for(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<AppointmentLog>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointment_logs?appointment_id=eq.{}&order=created_at.asc",
            appointment_id
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, self.token(), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_rows(result)
    }
}
