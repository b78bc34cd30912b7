// libs/appointment-cell/src/repository/mod.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use doctor_cell::models::OperatingHours;

use crate::models::{
    Appointment, AppointmentError, AppointmentLog, AppointmentSearchQuery, AppointmentStatus,
    NewAppointment, ReminderKind,
};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryRepository;
pub use supabase::SupabaseAppointmentRepository;

/// Fields updated alongside a status change. The date and duration are only
/// set when re-entering `scheduled` from `rescheduled`.
#[derive(Debug, Clone)]
pub struct TransitionChange {
    pub new_status: AppointmentStatus,
    pub new_date: Option<DateTime<Utc>>,
    pub new_duration_minutes: Option<i32>,
    pub note: Option<String>,
}

impl TransitionChange {
    pub fn to(new_status: AppointmentStatus) -> Self {
        Self {
            new_status,
            new_date: None,
            new_duration_minutes: None,
            note: None,
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.new_date = Some(date);
        self
    }

    pub fn with_duration(mut self, minutes: i32) -> Self {
        self.new_duration_minutes = Some(minutes);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Narrow persistence seam for the appointment core. Every status mutation
/// goes through `insert`/`apply_transition`/`mark_missed_before`, each of
/// which persists the status row and its audit log row in one atomic unit.
#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn fetch(&self, id: Uuid) -> Result<Appointment, AppointmentError>;

    async fn search(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Active appointments for the doctor overlapping [start, end).
    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Insert the appointment row and its initial log row together.
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, AppointmentError>;

    /// Apply a validated status change plus its log row atomically.
    async fn apply_transition(
        &self,
        id: Uuid,
        change: TransitionChange,
    ) -> Result<Appointment, AppointmentError>;

    /// Transition every pending/scheduled appointment dated before `cutoff`
    /// to `missed` in one conditional batch, returning the affected ids.
    async fn mark_missed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, AppointmentError>;

    /// Scheduled appointments inside [window_start, window_end] whose
    /// sentinel for `kind` is still unset.
    async fn reminder_candidates(
        &self,
        kind: ReminderKind,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError>;

    /// Compare-and-set the reminder sentinel. Returns false when another
    /// sweep already claimed this appointment.
    async fn claim_reminder(
        &self,
        id: Uuid,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError>;

    async fn operating_hours(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<OperatingHours>, AppointmentError>;

    async fn doctor_default_duration(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<i32>, AppointmentError>;

    async fn logs_for(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<AppointmentLog>, AppointmentError>;
}
