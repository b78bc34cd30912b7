// libs/appointment-cell/src/repository/memory.rs
use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use doctor_cell::models::OperatingHours;

use crate::models::{
    Appointment, AppointmentError, AppointmentLog, AppointmentSearchQuery, AppointmentStatus,
    NewAppointment, ReminderKind,
};
use crate::repository::{AppointmentRepository, TransitionChange};

#[derive(Default)]
struct Store {
    appointments: HashMap<Uuid, Appointment>,
    logs: Vec<AppointmentLog>,
    hours: HashMap<(Uuid, i32), OperatingHours>,
    doctor_defaults: HashMap<Uuid, i32>,
}

/// In-memory record store used by unit and service tests. Mirrors the
/// atomicity of the PostgREST functions: every status write appends its log
/// row under the same lock.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_operating_hours(&self, hours: OperatingHours) {
        let mut store = self.store.lock().unwrap();
        store
            .hours
            .insert((hours.doctor_id, hours.day_of_week), hours);
    }

    pub fn set_doctor_default_duration(&self, doctor_id: Uuid, minutes: i32) {
        self.store
            .lock()
            .unwrap()
            .doctor_defaults
            .insert(doctor_id, minutes);
    }

    /// Seed an appointment row directly, bypassing validation. The initial
    /// log row is appended like the production insert does.
    pub fn seed_appointment(&self, appointment: Appointment) {
        let mut store = self.store.lock().unwrap();
        store.logs.push(AppointmentLog {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            status: appointment.status,
            created_at: appointment.created_at,
        });
        store.appointments.insert(appointment.id, appointment);
    }

    pub fn appointment(&self, id: Uuid) -> Option<Appointment> {
        self.store.lock().unwrap().appointments.get(&id).cloned()
    }

    pub fn log_count_for(&self, appointment_id: Uuid, status: AppointmentStatus) -> usize {
        self.store
            .lock()
            .unwrap()
            .logs
            .iter()
            .filter(|log| log.appointment_id == appointment_id && log.status == status)
            .count()
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryRepository {
    async fn fetch(&self, id: Uuid) -> Result<Appointment, AppointmentError> {
        self.store
            .lock()
            .unwrap()
            .appointments
            .get(&id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn search(
        &self,
        query: &AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.store.lock().unwrap();
        let mut results: Vec<Appointment> = store
            .appointments
            .values()
            .filter(|apt| {
                query.patient_id.is_none_or(|id| apt.patient_id == id)
                    && query.doctor_id.is_none_or(|id| apt.doctor_id == id)
                    && query.status.is_none_or(|s| apt.status == s)
                    && query.modality.is_none_or(|m| apt.modality == m)
                    && query.from_date.is_none_or(|d| apt.appointment_date >= d)
                    && query.to_date.is_none_or(|d| apt.appointment_date <= d)
            })
            .cloned()
            .collect();

        results.sort_by_key(|apt| apt.appointment_date);

        let offset = query.offset.unwrap_or(0) as usize;
        let limit = query.limit.unwrap_or(50) as usize;
        Ok(results.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_overlapping(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .appointments
            .values()
            .filter(|apt| {
                apt.doctor_id == doctor_id
                    && apt.status.is_active()
                    && exclude != Some(apt.id)
                    && apt.appointment_date < end
                    && apt.scheduled_end_time() > start
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, new: NewAppointment) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            modality: new.modality,
            appointment_date: new.appointment_date,
            duration_minutes: new.duration_minutes,
            status: new.status,
            notes: new.notes,
            reminder_24h_sent_at: None,
            reminder_1h_sent_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut store = self.store.lock().unwrap();
        store.logs.push(AppointmentLog {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            status: appointment.status,
            created_at: now,
        });
        store.appointments.insert(appointment.id, appointment.clone());

        Ok(appointment)
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        change: TransitionChange,
    ) -> Result<Appointment, AppointmentError> {
        let now = Utc::now();
        let mut store = self.store.lock().unwrap();

        let appointment = store
            .appointments
            .get_mut(&id)
            .ok_or(AppointmentError::NotFound)?;

        appointment.status = change.new_status;
        if let Some(date) = change.new_date {
            appointment.appointment_date = date;
        }
        if let Some(minutes) = change.new_duration_minutes {
            appointment.duration_minutes = minutes;
        }
        if let Some(note) = change.note {
            appointment.notes = Some(match appointment.notes.take() {
                Some(existing) => format!("{}\n{}", existing, note),
                None => note,
            });
        }
        appointment.updated_at = now;
        let updated = appointment.clone();

        store.logs.push(AppointmentLog {
            id: Uuid::new_v4(),
            appointment_id: id,
            status: change.new_status,
            created_at: now,
        });

        Ok(updated)
    }

    async fn mark_missed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, AppointmentError> {
        let now = Utc::now();
        let mut store = self.store.lock().unwrap();

        let ids: Vec<Uuid> = store
            .appointments
            .values()
            .filter(|apt| {
                matches!(
                    apt.status,
                    AppointmentStatus::Pending | AppointmentStatus::Scheduled
                ) && apt.appointment_date < cutoff
            })
            .map(|apt| apt.id)
            .collect();

        for id in &ids {
            if let Some(apt) = store.appointments.get_mut(id) {
                apt.status = AppointmentStatus::Missed;
                apt.updated_at = now;
            }
            store.logs.push(AppointmentLog {
                id: Uuid::new_v4(),
                appointment_id: *id,
                status: AppointmentStatus::Missed,
                created_at: now,
            });
        }

        Ok(ids)
    }

    async fn reminder_candidates(
        &self,
        kind: ReminderKind,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .appointments
            .values()
            .filter(|apt| {
                apt.status == AppointmentStatus::Scheduled
                    && apt.appointment_date >= window_start
                    && apt.appointment_date <= window_end
                    && match kind {
                        ReminderKind::TwentyFourHour => apt.reminder_24h_sent_at.is_none(),
                        ReminderKind::OneHour => apt.reminder_1h_sent_at.is_none(),
                    }
            })
            .cloned()
            .collect())
    }

    async fn claim_reminder(
        &self,
        id: Uuid,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> Result<bool, AppointmentError> {
        let mut store = self.store.lock().unwrap();
        let appointment = store
            .appointments
            .get_mut(&id)
            .ok_or(AppointmentError::NotFound)?;

        let sentinel = match kind {
            ReminderKind::TwentyFourHour => &mut appointment.reminder_24h_sent_at,
            ReminderKind::OneHour => &mut appointment.reminder_1h_sent_at,
        };

        if sentinel.is_some() {
            return Ok(false);
        }
        *sentinel = Some(now);
        Ok(true)
    }

    async fn operating_hours(
        &self,
        doctor_id: Uuid,
        day_of_week: i32,
    ) -> Result<Option<OperatingHours>, AppointmentError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .hours
            .get(&(doctor_id, day_of_week))
            .cloned())
    }

    async fn doctor_default_duration(
        &self,
        doctor_id: Uuid,
    ) -> Result<Option<i32>, AppointmentError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .doctor_defaults
            .get(&doctor_id)
            .copied())
    }

    async fn logs_for(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<AppointmentLog>, AppointmentError> {
        Ok(self
            .store
            .lock()
            .unwrap()
            .logs
            .iter()
            .filter(|log| log.appointment_id == appointment_id)
            .cloned()
            .collect())
    }
}
