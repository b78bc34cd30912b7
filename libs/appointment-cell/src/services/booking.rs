// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use shared_models::RequestContext;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    Appointment, AppointmentError, AppointmentLog, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, CancelAppointmentRequest, CancelledBy, NewAppointment,
    RescheduleAppointmentRequest,
};
use crate::repository::{AppointmentRepository, TransitionChange};
use crate::services::lifecycle::LifecycleEngine;
use crate::services::slots::SlotValidator;

/// Orchestrates the appointment lifecycle over the repository seam: slot
/// validation on the way in, the transition engine on every status change,
/// caller authorization throughout.
pub struct AppointmentService {
    repository: Arc<dyn AppointmentRepository>,
}

impl AppointmentService {
    pub fn new(repository: Arc<dyn AppointmentRepository>) -> Self {
        Self { repository }
    }

    pub async fn book_appointment(
        &self,
        ctx: &RequestContext,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        if !ctx.user.is_admin() && !is_caller(ctx, request.patient_id) {
            return Err(AppointmentError::Unauthorized);
        }

        let validator = SlotValidator::new(self.repository.as_ref());
        let duration_minutes = validator
            .resolve_duration(request.doctor_id, request.duration_minutes)
            .await?;
        validator
            .validate_slot(
                request.doctor_id,
                request.appointment_date,
                duration_minutes,
                None,
            )
            .await?;

        let status = if request.requires_confirmation {
            AppointmentStatus::Pending
        } else {
            AppointmentStatus::Scheduled
        };

        let appointment = self
            .repository
            .insert(NewAppointment {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                modality: request.modality,
                appointment_date: request.appointment_date,
                duration_minutes,
                status,
                notes: request.notes,
            })
            .await?;

        info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            %status,
            "appointment booked"
        );
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        self.authorize_participant(ctx, &appointment)?;
        Ok(appointment)
    }

    pub async fn get_appointment_history(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Vec<AppointmentLog>, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        self.authorize_participant(ctx, &appointment)?;
        self.repository.logs_for(id).await
    }

    /// Non-admin callers only ever see their own appointments; the query is
    /// pinned to the caller's id before it reaches the store.
    pub async fn search_appointments(
        &self,
        ctx: &RequestContext,
        mut query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        if !ctx.user.is_admin() {
            if ctx.user.is_doctor() {
                query.doctor_id = Some(caller_id(ctx)?);
            } else {
                query.patient_id = Some(caller_id(ctx)?);
            }
        }
        self.repository.search(&query).await
    }

    /// Doctor confirmation: `pending -> scheduled`.
    pub async fn confirm_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        if !ctx.user.is_admin() && !is_caller(ctx, appointment.doctor_id) {
            return Err(AppointmentError::Unauthorized);
        }
        self.transition(&appointment, TransitionChange::to(AppointmentStatus::Scheduled))
            .await
    }

    /// Consultation start: `scheduled -> in_progress`.
    pub async fn start_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        if !ctx.user.is_admin() && !is_caller(ctx, appointment.doctor_id) {
            return Err(AppointmentError::Unauthorized);
        }
        self.transition(
            &appointment,
            TransitionChange::to(AppointmentStatus::InProgress),
        )
        .await
    }

    /// Consultation end: `in_progress -> completed`. Ending the video call
    /// does not complete the appointment; this call does.
    pub async fn complete_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        self.authorize_participant(ctx, &appointment)?;
        self.transition(
            &appointment,
            TransitionChange::to(AppointmentStatus::Completed),
        )
        .await
    }

    pub async fn cancel_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        match request.cancelled_by {
            CancelledBy::Patient | CancelledBy::Doctor => {
                self.authorize_participant(ctx, &appointment)?
            }
            CancelledBy::System => {
                if !ctx.user.is_admin() {
                    return Err(AppointmentError::Unauthorized);
                }
            }
        }

        let who = match request.cancelled_by {
            CancelledBy::Patient => "patient",
            CancelledBy::Doctor => "doctor",
            CancelledBy::System => "system",
        };
        self.transition(
            &appointment,
            TransitionChange::to(AppointmentStatus::Cancelled)
                .with_note(format!("cancelled by {}: {}", who, request.reason)),
        )
        .await
    }

    /// Reschedule is two engine-validated transitions applied back to back:
    /// `scheduled -> rescheduled`, then `rescheduled -> scheduled` carrying
    /// the new instant. The log keeps both rows.
    pub async fn reschedule_appointment(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.repository.fetch(id).await?;
        self.authorize_participant(ctx, &appointment)?;

        LifecycleEngine::validate_transition(appointment.status, AppointmentStatus::Rescheduled)?;

        let duration_minutes = request
            .new_duration_minutes
            .unwrap_or(appointment.duration_minutes);
        let validator = SlotValidator::new(self.repository.as_ref());
        validator
            .validate_slot(
                appointment.doctor_id,
                request.new_appointment_date,
                duration_minutes,
                Some(appointment.id),
            )
            .await?;

        let mut marker = TransitionChange::to(AppointmentStatus::Rescheduled);
        if let Some(reason) = request.reason {
            marker = marker.with_note(format!("rescheduled: {}", reason));
        }
        let intermediate = self.repository.apply_transition(id, marker).await?;

        debug!(appointment_id = %id, "re-entering scheduled with new slot");
        self.transition(
            &intermediate,
            TransitionChange::to(AppointmentStatus::Scheduled)
                .with_date(request.new_appointment_date)
                .with_duration(duration_minutes),
        )
        .await
    }

    async fn transition(
        &self,
        appointment: &Appointment,
        change: TransitionChange,
    ) -> Result<Appointment, AppointmentError> {
        LifecycleEngine::validate_transition(appointment.status, change.new_status)?;
        let updated = self.repository.apply_transition(appointment.id, change).await?;
        info!(
            appointment_id = %appointment.id,
            from = %appointment.status,
            to = %updated.status,
            "appointment status changed"
        );
        Ok(updated)
    }

    fn authorize_participant(
        &self,
        ctx: &RequestContext,
        appointment: &Appointment,
    ) -> Result<(), AppointmentError> {
        if ctx.user.is_admin()
            || is_caller(ctx, appointment.patient_id)
            || is_caller(ctx, appointment.doctor_id)
        {
            Ok(())
        } else {
            Err(AppointmentError::Unauthorized)
        }
    }
}

fn caller_id(ctx: &RequestContext) -> Result<Uuid, AppointmentError> {
    ctx.user
        .id
        .parse()
        .map_err(|_| AppointmentError::Unauthorized)
}

fn is_caller(ctx: &RequestContext, id: Uuid) -> bool {
    ctx.user.id.parse::<Uuid>().map(|uid| uid == id).unwrap_or(false)
}
