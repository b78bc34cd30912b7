// libs/appointment-cell/src/lib.rs
pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use models::{
    Appointment, AppointmentError, AppointmentLog, AppointmentModality, AppointmentSearchQuery,
    AppointmentStatus, ReminderKind,
};
pub use repository::{AppointmentRepository, InMemoryRepository, SupabaseAppointmentRepository, TransitionChange};
pub use router::appointment_routes;
pub use services::AppointmentService;
