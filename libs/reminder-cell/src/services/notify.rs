// libs/reminder-cell/src/services/notify.rs
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use appointment_cell::models::Appointment;
use shared_config::AppConfig;

use crate::models::NotifyError;

/// Delivery seam for appointment reminders. Production posts to the
/// configured email/SMS webhook; tests substitute recording fakes.
#[async_trait]
pub trait ReminderNotifier: Send + Sync {
    async fn send_appointment_reminder(
        &self,
        appointment: &Appointment,
        hours_before: u32,
    ) -> Result<(), NotifyError>;
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: String,
    api_key: String,
}

impl WebhookNotifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: config.notification_webhook_url.clone(),
            api_key: config.notification_api_key.clone(),
        }
    }
}

#[async_trait]
impl ReminderNotifier for WebhookNotifier {
    async fn send_appointment_reminder(
        &self,
        appointment: &Appointment,
        hours_before: u32,
    ) -> Result<(), NotifyError> {
        debug!(
            appointment_id = %appointment.id,
            hours_before,
            "sending appointment reminder"
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .header("X-Api-Key", &self.api_key)
            .json(&json!({
                "type": "appointment_reminder",
                "hours_before": hours_before,
                "appointment_id": appointment.id,
                "patient_id": appointment.patient_id,
                "doctor_id": appointment.doctor_id,
                "appointment_date": appointment.appointment_date.to_rfc3339(),
                "modality": appointment.modality.to_string(),
            }))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}
