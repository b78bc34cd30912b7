// libs/reminder-cell/src/models.rs
use serde::Serialize;

use appointment_cell::models::AppointmentError;

/// Outcome of one reminder sweep run across both windows.
#[derive(Debug, Default, Serialize)]
pub struct ReminderSweepReport {
    pub reminders_24h: usize,
    pub reminders_1h: usize,
    /// One entry per appointment whose send failed after a won claim; the
    /// batch never aborts on individual failures.
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("Repository error: {0}")]
    Repository(#[from] AppointmentError),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to reach notification webhook: {0}")]
    Transport(String),

    #[error("Notification webhook rejected the request: {0}")]
    Rejected(u16),
}
