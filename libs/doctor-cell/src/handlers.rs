// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, ReplaceWeeklyHoursRequest};
use crate::services::hours::OperatingHoursService;

#[axum::debug_handler]
pub async fn get_operating_hours(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = OperatingHoursService::new(&state);

    let hours = service
        .list_hours(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "operating_hours": hours
    })))
}

#[axum::debug_handler]
pub async fn replace_operating_hours(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<ReplaceWeeklyHoursRequest>,
) -> Result<Json<Value>, AppError> {
    // Only the doctor themselves or an admin may edit the schedule.
    let is_own_schedule = doctor_id.to_string() == user.id;
    if !is_own_schedule && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to edit this doctor's operating hours".to_string(),
        ));
    }

    let service = OperatingHoursService::new(&state);

    let hours = service
        .replace_hours(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "operating_hours": hours,
        "message": "Operating hours updated successfully"
    })))
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::BadRequest(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}
