// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::RequestContext;

use crate::models::{
    AppointmentError, AppointmentSearchQuery, BookAppointmentRequest, CancelAppointmentRequest,
    RescheduleAppointmentRequest,
};
use crate::repository::SupabaseAppointmentRepository;
use crate::services::booking::AppointmentService;

fn service_for(state: &AppConfig, token: &str) -> AppointmentService {
    let repository = Arc::new(SupabaseAppointmentRepository::new(state, token));
    AppointmentService::new(repository)
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .book_appointment(&ctx, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Query(query): Query<AppointmentSearchQuery>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointments = service_for(&state, auth.token())
        .search_appointments(&ctx, query)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "count": appointments.len(),
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .get_appointment(&ctx, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({ "appointment": appointment })))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let logs = service_for(&state, auth.token())
        .get_appointment_history(&ctx, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "appointment_id": appointment_id,
        "history": logs
    })))
}

#[axum::debug_handler]
pub async fn confirm_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .confirm_appointment(&ctx, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn start_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .start_appointment(&ctx, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .complete_appointment(&ctx, appointment_id)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CancelAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .cancel_appointment(&ctx, appointment_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let ctx = RequestContext::new(user, auth.token());
    let appointment = service_for(&state, auth.token())
        .reschedule_appointment(&ctx, appointment_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

pub(crate) fn map_appointment_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        AppointmentError::OutsideOperatingHours => AppError::BadRequest(
            "Requested time is outside the doctor's operating hours".to_string(),
        ),
        AppointmentError::InThePast => {
            AppError::BadRequest("Requested time is in the past".to_string())
        }
        AppointmentError::SlotConflict => AppError::Conflict(
            "Requested slot conflicts with an existing booking".to_string(),
        ),
        AppointmentError::InvalidTransition { from, to } => {
            AppError::Conflict(format!("Invalid status transition: {} -> {}", from, to))
        }
        AppointmentError::Unauthorized => {
            AppError::Auth("Not authorized for this appointment".to_string())
        }
        AppointmentError::ValidationError(msg) => AppError::BadRequest(msg),
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}
