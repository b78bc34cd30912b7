// libs/appointment-cell/src/services/slots.rs
use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::AppointmentError;
use crate::repository::AppointmentRepository;

/// Used when neither the request nor the doctor profile supplies a duration.
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

/// Validates a requested slot against the doctor's weekly operating hours,
/// the clock, and existing active bookings, in that order, so a caller
/// always sees the most specific rejection first.
pub struct SlotValidator<'a> {
    repository: &'a dyn AppointmentRepository,
}

impl<'a> SlotValidator<'a> {
    pub fn new(repository: &'a dyn AppointmentRepository) -> Self {
        Self { repository }
    }

    /// Resolve the effective duration: request override, then the doctor's
    /// configured default, then the platform default.
    pub async fn resolve_duration(
        &self,
        doctor_id: Uuid,
        requested: Option<i32>,
    ) -> Result<i32, AppointmentError> {
        if let Some(minutes) = requested {
            if minutes <= 0 {
                return Err(AppointmentError::ValidationError(
                    "duration_minutes must be positive".to_string(),
                ));
            }
            return Ok(minutes);
        }

        Ok(self
            .repository
            .doctor_default_duration(doctor_id)
            .await?
            .unwrap_or(DEFAULT_DURATION_MINUTES))
    }

    pub async fn validate_slot(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let end = start + Duration::minutes(duration_minutes as i64);

        self.check_operating_hours(doctor_id, start, end).await?;

        if start < Utc::now() {
            return Err(AppointmentError::InThePast);
        }

        let overlapping = self
            .repository
            .find_overlapping(doctor_id, start, end, exclude_appointment)
            .await?;
        if !overlapping.is_empty() {
            debug!(
                %doctor_id,
                conflicts = overlapping.len(),
                "slot rejected: overlapping active appointments"
            );
            return Err(AppointmentError::SlotConflict);
        }

        Ok(())
    }

    async fn check_operating_hours(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), AppointmentError> {
        // Slots never span midnight; the whole window must fit in one day.
        if end.date_naive() != start.date_naive() {
            return Err(AppointmentError::OutsideOperatingHours);
        }

        let day_of_week = start.weekday().num_days_from_sunday() as i32;
        let hours = self
            .repository
            .operating_hours(doctor_id, day_of_week)
            .await?
            .ok_or(AppointmentError::OutsideOperatingHours)?;

        if !hours.is_open {
            return Err(AppointmentError::OutsideOperatingHours);
        }
        if start.time() < hours.opens_at || end.time() > hours.closes_at {
            return Err(AppointmentError::OutsideOperatingHours);
        }

        Ok(())
    }
}
