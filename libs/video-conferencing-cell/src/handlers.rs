// libs/video-conferencing-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{PreviewRequest, TrackToggleRequest, VideoError};
use crate::services::session::VideoSessionCoordinator;

/// Shared router state: the config plus the long-lived coordinator holding
/// the in-flight call sessions.
#[derive(Clone)]
pub struct VideoState {
    pub config: Arc<AppConfig>,
    pub coordinator: Arc<VideoSessionCoordinator>,
}

pub async fn enter_pre_room(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .enter_pre_room(appointment_id, &user.id, request.camera, request.microphone)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn record_consent(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .record_consent(appointment_id)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn join_call(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .join(appointment_id)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn toggle_tracks(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
    Json(request): Json<TrackToggleRequest>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .set_tracks(appointment_id, request.camera, request.microphone)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn leave_call(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .leave(appointment_id)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "success": true, "session": session })))
}

pub async fn get_call_state(
    State(state): State<VideoState>,
    Path(appointment_id): Path<Uuid>,
    Extension(_user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let session = state
        .coordinator
        .session_state(appointment_id)
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({ "session": session })))
}

pub async fn health_check(State(state): State<VideoState>) -> Result<Json<Value>, AppError> {
    let healthy = state
        .coordinator
        .provider_health()
        .await
        .map_err(map_video_error)?;

    Ok(Json(json!({
        "healthy": healthy,
        "configured": state.config.is_video_conferencing_configured(),
        "provider": "cloudflare_realtime"
    })))
}

fn map_video_error(e: VideoError) -> AppError {
    match e {
        VideoError::SessionNotFound => {
            AppError::NotFound("No call session for this appointment".to_string())
        }
        VideoError::ConsentRequired => {
            AppError::BadRequest("Consent is required before joining".to_string())
        }
        VideoError::InvalidPhase { phase } => {
            AppError::Conflict(format!("Operation not allowed in phase {}", phase))
        }
        VideoError::ConnectFailed(msg) | VideoError::Provider(msg) => {
            AppError::ExternalService(msg)
        }
        VideoError::NotConfigured => {
            AppError::Internal("Video conferencing not configured".to_string())
        }
    }
}
