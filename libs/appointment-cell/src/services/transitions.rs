// libs/appointment-cell/src/services/transitions.rs
use shared_models::{AppointmentStatus, SchedulingError};

/// All statuses reachable from `current` in one lifecycle step.
pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
    match current {
        AppointmentStatus::Pending => vec![
            AppointmentStatus::Approved,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ],
        AppointmentStatus::Approved => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ],
        AppointmentStatus::Confirmed => vec![
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ],
        // A rescheduled appointment lives on at its new time and goes
        // through check-in again.
        AppointmentStatus::Rescheduled => vec![
            AppointmentStatus::Confirmed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rescheduled,
        ],
        AppointmentStatus::Completed
        | AppointmentStatus::Cancelled
        | AppointmentStatus::NoShow
        | AppointmentStatus::Rejected => vec![],
    }
}

/// Rejects transitions outside the matrix with a recoverable error.
pub fn validate_transition(
    current: AppointmentStatus,
    target: AppointmentStatus,
    action: &'static str,
) -> Result<(), SchedulingError> {
    if valid_transitions(current).contains(&target) {
        Ok(())
    } else {
        Err(SchedulingError::IllegalAppointmentTransition {
            status: current,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_have_no_transitions() {
        for status in [
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
            AppointmentStatus::NoShow,
            AppointmentStatus::Rejected,
        ] {
            assert!(valid_transitions(status).is_empty(), "{status} should be terminal");
        }
    }

    #[test]
    fn completion_requires_check_in() {
        assert!(validate_transition(
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            "completed"
        )
        .is_ok());
        assert!(validate_transition(
            AppointmentStatus::Approved,
            AppointmentStatus::Completed,
            "completed"
        )
        .is_err());
    }

    #[test]
    fn re_approving_is_rejected_not_a_crash() {
        let err = validate_transition(
            AppointmentStatus::Approved,
            AppointmentStatus::Approved,
            "approved",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SchedulingError::IllegalAppointmentTransition { .. }
        ));
    }
}
