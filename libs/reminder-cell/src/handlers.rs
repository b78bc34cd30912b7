// libs/reminder-cell/src/handlers.rs
use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::warn;

use appointment_cell::repository::SupabaseAppointmentRepository;
use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::ReminderError;
use crate::services::notify::WebhookNotifier;
use crate::services::sweep::SweepService;

/// Cron endpoints authenticate with the shared secret, not a user JWT; the
/// header is optional in the extractor so both absence and mismatch come
/// back as 401.
fn check_cron_secret(
    state: &AppConfig,
    auth: Option<&TypedHeader<Authorization<Bearer>>>,
) -> Result<(), AppError> {
    match auth {
        Some(TypedHeader(header)) if header.token() == state.cron_secret => Ok(()),
        _ => {
            warn!("cron endpoint called with missing or invalid secret");
            Err(AppError::Auth("Invalid cron secret".to_string()))
        }
    }
}

fn sweep_service(state: &AppConfig) -> SweepService {
    let repository = Arc::new(SupabaseAppointmentRepository::new(
        state,
        &state.supabase_anon_key,
    ));
    let notifier = Arc::new(WebhookNotifier::new(state));
    SweepService::new(repository, notifier)
}

#[axum::debug_handler]
pub async fn run_reminder_sweep(
    State(state): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<Value>, AppError> {
    check_cron_secret(&state, auth.as_ref())?;

    let now = Utc::now();
    let report = sweep_service(&state)
        .run_reminder_sweep(now)
        .await
        .map_err(map_reminder_error)?;

    Ok(Json(json!({
        "success": true,
        "timestamp": now.to_rfc3339(),
        "reminders_24h": report.reminders_24h,
        "reminders_1h": report.reminders_1h,
        "errors": report.errors
    })))
}

#[axum::debug_handler]
pub async fn run_missed_sweep(
    State(state): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<Value>, AppError> {
    check_cron_secret(&state, auth.as_ref())?;

    let updated = sweep_service(&state)
        .run_missed_sweep(Utc::now())
        .await
        .map_err(map_reminder_error)?;

    Ok(Json(json!({
        "success": true,
        "updated_count": updated.len()
    })))
}

fn map_reminder_error(e: ReminderError) -> AppError {
    match e {
        ReminderError::Repository(inner) => AppError::Database(inner.to_string()),
    }
}
