// libs/shared/models/src/reschedule.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A multi-party reschedule negotiation targeting one appointment.
///
/// The request references its appointment but does not own it; the
/// appointment itself is mutated only when the doctor approves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: RescheduleStatus,
    pub reason: String,
    pub preferred_windows: String,
    pub old_scheduled_at: DateTime<Utc>,
    pub new_scheduled_at: Option<DateTime<Utc>>,
    pub selected_option_id: Option<Uuid>,
    pub doctor_decision_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RescheduleStatus {
    Requested,
    Proposed,
    PatientSelected,
    Approved,
    Rejected,
    Cancelled,
}

impl RescheduleStatus {
    /// Active requests block a second request on the same appointment.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RescheduleStatus::Requested
                | RescheduleStatus::Proposed
                | RescheduleStatus::PatientSelected
        )
    }
}

impl fmt::Display for RescheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RescheduleStatus::Requested => write!(f, "requested"),
            RescheduleStatus::Proposed => write!(f, "proposed"),
            RescheduleStatus::PatientSelected => write!(f, "patient_selected"),
            RescheduleStatus::Approved => write!(f, "approved"),
            RescheduleStatus::Rejected => write!(f, "rejected"),
            RescheduleStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A candidate replacement slot proposed by staff or the doctor.
/// Owned by exactly one request; deleted with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleOption {
    pub id: Uuid,
    pub request_id: Uuid,
    pub proposed_start: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
    pub location: String,
    pub is_chosen: bool,
    pub created_at: DateTime<Utc>,
}
