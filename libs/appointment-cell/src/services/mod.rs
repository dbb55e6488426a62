pub mod booking;
pub mod clinic;

pub use booking::BookingCoordinator;
pub use clinic::ClinicService;
