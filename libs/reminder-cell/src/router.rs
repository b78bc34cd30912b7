// libs/reminder-cell/src/router.rs
use std::sync::Arc;

use axum::{routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;

/// Cron routes carry no JWT middleware; each handler checks the shared
/// secret itself.
pub fn cron_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/reminders", get(handlers::run_reminder_sweep))
        .route("/missed", get(handlers::run_missed_sweep))
        .with_state(state)
}
