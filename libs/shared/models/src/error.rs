// libs/shared/models/src/error.rs
use thiserror::Error;

use crate::appointment::AppointmentStatus;
use crate::reschedule::RescheduleStatus;

/// Error taxonomy shared by all scheduling cells.
///
/// Every variant is recoverable by the caller; a rejected operation leaves
/// no partial state behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot no longer available: {0}")]
    Conflict(String),

    #[error("Appointment cannot be {action} in status {status}")]
    IllegalAppointmentTransition {
        status: AppointmentStatus,
        action: &'static str,
    },

    #[error("Reschedule request cannot be {action} in status {status}")]
    IllegalRescheduleTransition {
        status: RescheduleStatus,
        action: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Repository error: {0}")]
    Repository(String),
}

impl SchedulingError {
    pub fn validation(msg: impl Into<String>) -> Self {
        SchedulingError::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        SchedulingError::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        SchedulingError::NotFound(msg.into())
    }
}
