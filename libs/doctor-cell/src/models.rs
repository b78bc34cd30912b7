// libs/doctor-cell/src/models.rs
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One weekly operating window for a doctor. A weekday with no row is
/// treated as closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingHours {
    pub id: Uuid,
    pub doctor_id: Uuid,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: i32,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub is_open: bool,
}

/// The slice of the doctors table this service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub default_duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyHoursEntry {
    pub day_of_week: i32,
    pub opens_at: NaiveTime,
    pub closes_at: NaiveTime,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceWeeklyHoursRequest {
    pub entries: Vec<WeeklyHoursEntry>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
