use std::sync::Arc;

use axum::{routing::get, Router};
use tracing::warn;

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use reminder_cell::router::cron_routes;
use shared_config::AppConfig;
use video_conferencing_cell::router::video_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let mut router = Router::new()
        .route("/", get(|| async { "Telecare API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/cron", cron_routes(state.clone()));

    // Video routes need provider credentials; the rest of the API stays up
    // without them.
    match video_routes(state.clone()) {
        Ok(routes) => router = router.nest("/video", routes),
        Err(e) => warn!("Video conferencing disabled: {}", e),
    }

    router
}
