// libs/doctor-cell/src/lib.rs
//! Doctor-facing schedule configuration: weekly operating hours consumed by
//! the appointment slot validator.

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use models::{DoctorProfile, OperatingHours};
pub use router::doctor_routes;
