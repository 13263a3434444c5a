pub mod negotiation;

pub use negotiation::RescheduleNegotiationService;
