// libs/reminder-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{NotifyError, ReminderError, ReminderSweepReport};
pub use router::cron_routes;
pub use services::{ReminderNotifier, SweepService, WebhookNotifier};
