// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/search", get(handlers::search_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/{appointment_id}/history",
            get(handlers::get_appointment_history),
        )
        .route(
            "/{appointment_id}/confirm",
            post(handlers::confirm_appointment),
        )
        .route("/{appointment_id}/start", post(handlers::start_appointment))
        .route(
            "/{appointment_id}/complete",
            post(handlers::complete_appointment),
        )
        .route(
            "/{appointment_id}/cancel",
            post(handlers::cancel_appointment),
        )
        .route(
            "/{appointment_id}/reschedule",
            patch(handlers::reschedule_appointment),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
