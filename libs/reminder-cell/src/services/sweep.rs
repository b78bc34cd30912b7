// libs/reminder-cell/src/services/sweep.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::models::ReminderKind;
use appointment_cell::repository::AppointmentRepository;

use crate::models::{ReminderError, ReminderSweepReport};
use crate::services::notify::ReminderNotifier;

/// Reminder window for a sweep run. Wider than the cron cadence on both
/// sides so a late or early trigger never leaves a gap between runs; the
/// sentinel CAS keeps the overlap from double-sending.
pub fn reminder_window(kind: ReminderKind, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    match kind {
        ReminderKind::TwentyFourHour => (now + Duration::hours(23), now + Duration::hours(25)),
        ReminderKind::OneHour => (now + Duration::minutes(50), now + Duration::minutes(70)),
    }
}

/// Cron-driven sweeps over the appointment store. Stateless between runs;
/// all idempotency lives in the store (reminder sentinels, conditional
/// missed batch).
pub struct SweepService {
    repository: Arc<dyn AppointmentRepository>,
    notifier: Arc<dyn ReminderNotifier>,
}

impl SweepService {
    pub fn new(
        repository: Arc<dyn AppointmentRepository>,
        notifier: Arc<dyn ReminderNotifier>,
    ) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    pub async fn run_reminder_sweep(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ReminderSweepReport, ReminderError> {
        let mut report = ReminderSweepReport::default();

        for kind in [ReminderKind::TwentyFourHour, ReminderKind::OneHour] {
            let sent = self.sweep_kind(kind, now, &mut report.errors).await?;
            match kind {
                ReminderKind::TwentyFourHour => report.reminders_24h = sent,
                ReminderKind::OneHour => report.reminders_1h = sent,
            }
        }

        info!(
            reminders_24h = report.reminders_24h,
            reminders_1h = report.reminders_1h,
            errors = report.errors.len(),
            "reminder sweep finished"
        );
        Ok(report)
    }

    async fn sweep_kind(
        &self,
        kind: ReminderKind,
        now: DateTime<Utc>,
        errors: &mut Vec<String>,
    ) -> Result<usize, ReminderError> {
        let (window_start, window_end) = reminder_window(kind, now);
        let candidates = self
            .repository
            .reminder_candidates(kind, window_start, window_end)
            .await?;

        let mut sent = 0;
        for appointment in candidates {
            // Claim before sending: losing the CAS means another sweep owns
            // this reminder, so skip silently.
            match self.repository.claim_reminder(appointment.id, kind, now).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    errors.push(format!("appointment {}: {}", appointment.id, e));
                    continue;
                }
            }

            match self
                .notifier
                .send_appointment_reminder(&appointment, kind.hours_before())
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => {
                    // The sentinel stays set: at-most-once delivery.
                    warn!(appointment_id = %appointment.id, error = %e, "reminder send failed");
                    errors.push(format!("appointment {}: {}", appointment.id, e));
                }
            }
        }

        Ok(sent)
    }

    /// Transition every past-due pending/scheduled appointment to `missed`.
    /// The store applies the whole batch as one conditional update, so a
    /// concurrent completion never gets overwritten.
    pub async fn run_missed_sweep(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, ReminderError> {
        let updated = self.repository.mark_missed_before(now).await?;
        info!(updated_count = updated.len(), "missed sweep finished");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotifyError;
    use appointment_cell::models::{
        Appointment, AppointmentModality, AppointmentStatus,
    };
    use appointment_cell::repository::InMemoryRepository;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every delivery; optionally fails for a chosen appointment.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(Uuid, u32)>>,
        fail_for: Option<Uuid>,
    }

    impl RecordingNotifier {
        fn failing_for(id: Uuid) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: Some(id),
            }
        }

        fn sent(&self) -> Vec<(Uuid, u32)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReminderNotifier for RecordingNotifier {
        async fn send_appointment_reminder(
            &self,
            appointment: &Appointment,
            hours_before: u32,
        ) -> Result<(), NotifyError> {
            if self.fail_for == Some(appointment.id) {
                return Err(NotifyError::Rejected(500));
            }
            self.sent.lock().unwrap().push((appointment.id, hours_before));
            Ok(())
        }
    }

    fn scheduled_at(date: DateTime<Utc>) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            modality: AppointmentModality::Online,
            appointment_date: date,
            duration_minutes: 30,
            status: AppointmentStatus::Scheduled,
            notes: None,
            reminder_24h_sent_at: None,
            reminder_1h_sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn service_with(
        repo: Arc<InMemoryRepository>,
        notifier: Arc<RecordingNotifier>,
    ) -> SweepService {
        SweepService::new(repo, notifier)
    }

    #[tokio::test]
    async fn appointment_at_exactly_24h_is_inside_the_window() {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let now = Utc::now();

        let appointment = scheduled_at(now + Duration::hours(24));
        repo.seed_appointment(appointment.clone());

        let service = service_with(repo.clone(), notifier.clone());
        let report = service.run_reminder_sweep(now).await.unwrap();

        assert_eq!(report.reminders_24h, 1);
        assert_eq!(report.reminders_1h, 0);
        assert!(report.errors.is_empty());
        assert_eq!(notifier.sent(), vec![(appointment.id, 24)]);
        assert!(repo
            .appointment(appointment.id)
            .unwrap()
            .reminder_24h_sent_at
            .is_some());
    }

    #[tokio::test]
    async fn second_sweep_does_not_resend() {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let now = Utc::now();
        repo.seed_appointment(scheduled_at(now + Duration::hours(24)));

        let service = service_with(repo.clone(), notifier.clone());
        service.run_reminder_sweep(now).await.unwrap();
        let second = service.run_reminder_sweep(now).await.unwrap();

        assert_eq!(second.reminders_24h, 0);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn appointment_outside_the_window_is_left_alone() {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let now = Utc::now();

        // 22h out: misses [now+23h, now+25h]; 3h out: misses both windows.
        repo.seed_appointment(scheduled_at(now + Duration::hours(22)));
        repo.seed_appointment(scheduled_at(now + Duration::hours(3)));

        let service = service_with(repo, notifier.clone());
        let report = service.run_reminder_sweep(now).await.unwrap();

        assert_eq!(report.reminders_24h, 0);
        assert_eq!(report.reminders_1h, 0);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn one_hour_window_uses_its_own_sentinel() {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let now = Utc::now();

        let appointment = scheduled_at(now + Duration::minutes(60));
        repo.seed_appointment(appointment.clone());

        let service = service_with(repo.clone(), notifier.clone());
        let report = service.run_reminder_sweep(now).await.unwrap();

        assert_eq!(report.reminders_1h, 1);
        assert_eq!(notifier.sent(), vec![(appointment.id, 1)]);
        let stored = repo.appointment(appointment.id).unwrap();
        assert!(stored.reminder_1h_sent_at.is_some());
        assert!(stored.reminder_24h_sent_at.is_none());
    }

    #[tokio::test]
    async fn send_failure_is_collected_and_never_retried() {
        let repo = Arc::new(InMemoryRepository::new());
        let now = Utc::now();

        let failing = scheduled_at(now + Duration::hours(24));
        let healthy = scheduled_at(now + Duration::hours(24) + Duration::minutes(30));
        repo.seed_appointment(failing.clone());
        repo.seed_appointment(healthy.clone());

        let notifier = Arc::new(RecordingNotifier::failing_for(failing.id));
        let service = service_with(repo.clone(), notifier.clone());
        let report = service.run_reminder_sweep(now).await.unwrap();

        // The healthy appointment still went out.
        assert_eq!(report.reminders_24h, 1);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains(&failing.id.to_string()));

        // The claim was won before the send failed, so the sentinel is set
        // and a later sweep does not retry.
        assert!(repo
            .appointment(failing.id)
            .unwrap()
            .reminder_24h_sent_at
            .is_some());
        let second = service.run_reminder_sweep(now).await.unwrap();
        assert_eq!(second.reminders_24h, 0);
        assert!(second.errors.is_empty());
    }

    #[tokio::test]
    async fn missed_sweep_marks_past_due_appointments_once() {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let now = Utc::now();

        let yesterday = scheduled_at(now - Duration::days(1));
        let upcoming = scheduled_at(now + Duration::days(1));
        repo.seed_appointment(yesterday.clone());
        repo.seed_appointment(upcoming.clone());

        let service = service_with(repo.clone(), notifier);
        let updated = service.run_missed_sweep(now).await.unwrap();

        assert_eq!(updated, vec![yesterday.id]);
        assert_eq!(
            repo.appointment(yesterday.id).unwrap().status,
            AppointmentStatus::Missed
        );
        assert_eq!(
            repo.log_count_for(yesterday.id, AppointmentStatus::Missed),
            1
        );
        assert_eq!(
            repo.appointment(upcoming.id).unwrap().status,
            AppointmentStatus::Scheduled
        );

        // Already-missed rows are not touched again.
        let second = service.run_missed_sweep(now).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(
            repo.log_count_for(yesterday.id, AppointmentStatus::Missed),
            1
        );
    }
}
