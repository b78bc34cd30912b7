// libs/video-conferencing-cell/src/router.rs
use std::sync::Arc;

use axum::{middleware, routing::get, routing::post, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, VideoState};
use crate::models::VideoError;
use crate::services::cloudflare::CloudflareRealtimeClient;
use crate::services::session::VideoSessionCoordinator;

pub fn video_routes(config: Arc<AppConfig>) -> Result<Router, VideoError> {
    let provider = Arc::new(CloudflareRealtimeClient::new(&config)?);
    Ok(video_routes_with_coordinator(
        config,
        Arc::new(VideoSessionCoordinator::new(provider)),
    ))
}

/// Router over an existing coordinator; tests inject fake providers here.
pub fn video_routes_with_coordinator(
    config: Arc<AppConfig>,
    coordinator: Arc<VideoSessionCoordinator>,
) -> Router {
    let state = VideoState {
        config: config.clone(),
        coordinator,
    };

    let protected_routes = Router::new()
        .route(
            "/calls/{appointment_id}/preview",
            post(handlers::enter_pre_room),
        )
        .route(
            "/calls/{appointment_id}/consent",
            post(handlers::record_consent),
        )
        .route("/calls/{appointment_id}/join", post(handlers::join_call))
        .route(
            "/calls/{appointment_id}/tracks",
            post(handlers::toggle_tracks),
        )
        .route("/calls/{appointment_id}/leave", post(handlers::leave_call))
        .route("/calls/{appointment_id}", get(handlers::get_call_state))
        .layer(middleware::from_fn_with_state(config, auth_middleware));

    let public_routes = Router::new().route("/health", get(handlers::health_check));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .with_state(state)
}
