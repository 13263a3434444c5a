pub mod availability;
pub mod conflict;
pub mod slots;

pub use availability::AvailabilityService;
pub use conflict::ConflictChecker;
pub use slots::SlotGenerator;
