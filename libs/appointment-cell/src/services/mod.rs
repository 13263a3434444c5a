pub mod booking;
pub mod lifecycle;
pub mod transitions;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
