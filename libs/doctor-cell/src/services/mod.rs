pub mod hours;

pub use hours::OperatingHoursService;
