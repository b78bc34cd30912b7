// libs/doctor-cell/src/services/hours.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorError, OperatingHours, ReplaceWeeklyHoursRequest, WeeklyHoursEntry};

pub struct OperatingHoursService {
    supabase: SupabaseClient,
}

impl OperatingHoursService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// List a doctor's weekly operating hours, ordered by weekday.
    pub async fn list_hours(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<OperatingHours>, DoctorError> {
        debug!("Fetching operating hours for doctor {}", doctor_id);

        let path = format!(
            "/rest/v1/doctor_operating_hours?doctor_id=eq.{}&order=day_of_week.asc",
            doctor_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<OperatingHours>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse hours: {}", e)))
    }

    /// Replace a doctor's whole weekly schedule. Existing rows are removed
    /// first so the entries are the single source of truth.
    pub async fn replace_hours(
        &self,
        doctor_id: Uuid,
        request: ReplaceWeeklyHoursRequest,
        auth_token: &str,
    ) -> Result<Vec<OperatingHours>, DoctorError> {
        debug!(
            "Replacing operating hours for doctor {} ({} entries)",
            doctor_id,
            request.entries.len()
        );

        for entry in &request.entries {
            Self::validate_entry(entry)?;
        }

        let mut seen_days = std::collections::HashSet::new();
        for entry in &request.entries {
            if !seen_days.insert(entry.day_of_week) {
                return Err(DoctorError::ValidationError(format!(
                    "Duplicate entry for day of week {}",
                    entry.day_of_week
                )));
            }
        }

        let delete_path = format!(
            "/rest/v1/doctor_operating_hours?doctor_id=eq.{}",
            doctor_id
        );
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &delete_path, Some(auth_token), None)
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if request.entries.is_empty() {
            return Ok(vec![]);
        }

        let rows: Vec<Value> = request
            .entries
            .iter()
            .map(|entry| {
                json!({
                    "doctor_id": doctor_id,
                    "day_of_week": entry.day_of_week,
                    "opens_at": entry.opens_at.format("%H:%M:%S").to_string(),
                    "closes_at": entry.closes_at.format("%H:%M:%S").to_string(),
                    "is_open": entry.is_open,
                    "updated_at": Utc::now().to_rfc3339(),
                })
            })
            .collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_operating_hours",
                Some(auth_token),
                Some(Value::Array(rows)),
                Some(headers),
            )
            .await
            .map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<OperatingHours>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse hours: {}", e)))
    }

    fn validate_entry(entry: &WeeklyHoursEntry) -> Result<(), DoctorError> {
        if entry.day_of_week < 0 || entry.day_of_week > 6 {
            return Err(DoctorError::ValidationError(
                "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
            ));
        }
        if entry.is_open && entry.opens_at >= entry.closes_at {
            return Err(DoctorError::ValidationError(
                "Opening time must be before closing time".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn entry(day: i32, open: &str, close: &str) -> WeeklyHoursEntry {
        WeeklyHoursEntry {
            day_of_week: day,
            opens_at: NaiveTime::parse_from_str(open, "%H:%M").unwrap(),
            closes_at: NaiveTime::parse_from_str(close, "%H:%M").unwrap(),
            is_open: true,
        }
    }

    #[test]
    fn test_valid_entry_accepted() {
        assert!(OperatingHoursService::validate_entry(&entry(1, "09:00", "17:00")).is_ok());
    }

    #[test]
    fn test_inverted_window_rejected() {
        let result = OperatingHoursService::validate_entry(&entry(1, "17:00", "09:00"));
        assert!(matches!(result, Err(DoctorError::ValidationError(_))));
    }

    #[test]
    fn test_out_of_range_weekday_rejected() {
        let result = OperatingHoursService::validate_entry(&entry(7, "09:00", "17:00"));
        assert!(matches!(result, Err(DoctorError::ValidationError(_))));
    }

    #[test]
    fn test_closed_day_skips_window_check() {
        let mut closed = entry(2, "00:00", "00:00");
        closed.is_open = false;
        assert!(OperatingHoursService::validate_entry(&closed).is_ok());
    }
}
