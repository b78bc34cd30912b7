// libs/appointment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub modality: AppointmentModality,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub reminder_24h_sent_at: Option<DateTime<Utc>>,
    pub reminder_1h_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Scheduled end time derived from the start instant and duration.
    pub fn scheduled_end_time(&self) -> DateTime<Utc> {
        self.appointment_date + chrono::Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentModality {
    Online,
    Physical,
}

impl fmt::Display for AppointmentModality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentModality::Online => write!(f, "online"),
            AppointmentModality::Physical => write!(f, "physical"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rescheduled,
    Missed,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::Missed
        )
    }

    /// Active appointments occupy their slot for conflict purposes.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending
                | AppointmentStatus::Scheduled
                | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Missed => write!(f, "missed"),
        }
    }
}

/// Append-only audit row, one per status change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentLog {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// Which reminder sentinel a sweep is operating on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    TwentyFourHour,
    OneHour,
}

impl ReminderKind {
    pub fn sentinel_column(&self) -> &'static str {
        match self {
            ReminderKind::TwentyFourHour => "reminder_24h_sent_at",
            ReminderKind::OneHour => "reminder_1h_sent_at",
        }
    }

    pub fn hours_before(&self) -> u32 {
        match self {
            ReminderKind::TwentyFourHour => 24,
            ReminderKind::OneHour => 1,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub modality: AppointmentModality,
    pub appointment_date: DateTime<Utc>,
    /// Falls back to the doctor's configured default when omitted.
    pub duration_minutes: Option<i32>,
    pub notes: Option<String>,
    /// When true the appointment starts in `pending` until the doctor confirms.
    #[serde(default)]
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_appointment_date: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelAppointmentRequest {
    pub reason: String,
    pub cancelled_by: CancelledBy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    System,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub modality: Option<AppointmentModality>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

/// Row shape handed to the repository on booking; the store assigns id and
/// audit timestamps and appends the initial log row in the same unit.
#[derive(Debug, Clone, Serialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub modality: AppointmentModality,
    pub appointment_date: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Requested time is outside the doctor's operating hours")]
    OutsideOperatingHours,

    #[error("Requested time is in the past")]
    InThePast,

    #[error("Requested slot conflicts with an existing booking")]
    SlotConflict,

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Unauthorized access to appointment")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
