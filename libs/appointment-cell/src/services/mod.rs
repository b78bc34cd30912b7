// libs/appointment-cell/src/services/mod.rs
pub mod booking;
pub mod lifecycle;
pub mod slots;

pub use booking::AppointmentService;
pub use lifecycle::LifecycleEngine;
pub use slots::SlotValidator;
