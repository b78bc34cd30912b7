// libs/reminder-cell/src/services/mod.rs
pub mod notify;
pub mod sweep;

pub use notify::{ReminderNotifier, WebhookNotifier};
pub use sweep::SweepService;
