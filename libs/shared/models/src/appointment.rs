// libs/shared/models/src/appointment.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A booked clinic visit. Cancellation is a status change; appointments are
/// never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    pub location: String,
    pub reason: String,
    pub cancel_reason: Option<String>,
    pub reschedule_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Scheduled end, derived from start and duration.
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration_minutes as i64)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Approved,
    Confirmed,
    Completed,
    Cancelled,
    Rescheduled,
    NoShow,
    Rejected,
}

impl AppointmentStatus {
    /// Terminal statuses admit no further lifecycle transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed
                | AppointmentStatus::Cancelled
                | AppointmentStatus::NoShow
                | AppointmentStatus::Rejected
        )
    }

    /// Statuses that still occupy their time slot for conflict purposes.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Rejected)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Approved => write!(f, "approved"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    Patient,
    Doctor,
    Staff,
}

/// Half-open interval overlap: `[start_a, end_a)` meets `[start_b, end_b)`
/// iff `start_a < end_b && start_b < end_a`.
///
/// Every conflict decision in the workspace goes through this one predicate.
pub fn intervals_overlap(
    start_a: DateTime<Utc>,
    end_a: DateTime<Utc>,
    start_b: DateTime<Utc>,
    end_b: DateTime<Utc>,
) -> bool {
    start_a < end_b && start_b < end_a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(AppointmentStatus::Completed.is_terminal());
        assert!(AppointmentStatus::Cancelled.is_terminal());
        assert!(AppointmentStatus::NoShow.is_terminal());
        assert!(!AppointmentStatus::Pending.is_terminal());
        assert!(!AppointmentStatus::Rescheduled.is_terminal());
    }

    #[test]
    fn cancelled_and_rejected_release_their_slot() {
        assert!(!AppointmentStatus::Cancelled.blocks_slot());
        assert!(!AppointmentStatus::Rejected.blocks_slot());
        assert!(AppointmentStatus::Approved.blocks_slot());
        assert!(AppointmentStatus::Rescheduled.blocks_slot());
    }

    #[test]
    fn statuses_serialize_in_snake_case() {
        assert_eq!(
            serde_json::to_string(&AppointmentStatus::NoShow).unwrap(),
            "\"no_show\""
        );
        let parsed: AppointmentStatus = serde_json::from_str("\"rescheduled\"").unwrap();
        assert_eq!(parsed, AppointmentStatus::Rescheduled);
        assert_eq!(AppointmentStatus::NoShow.to_string(), "no_show");
    }

    #[test]
    fn adjacent_intervals_do_not_overlap() {
        let t = |h| {
            chrono::NaiveDate::from_ymd_opt(2024, 6, 10)
                .unwrap()
                .and_hms_opt(h, 0, 0)
                .unwrap()
                .and_utc()
        };
        // Back-to-back bookings share a boundary instant but not time.
        assert!(!intervals_overlap(t(9), t(10), t(10), t(11)));
        assert!(intervals_overlap(t(9), t(11), t(10), t(12)));
        assert!(intervals_overlap(t(9), t(12), t(10), t(11)));
    }
}
