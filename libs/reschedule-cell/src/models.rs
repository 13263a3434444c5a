// libs/reschedule-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRescheduleRequest {
    pub appointment_id: Uuid,
    pub reason: String,
    /// Free-text preference hints for the staff member proposing options,
    /// e.g. "mornings next week".
    pub preferred_windows: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeOptionRequest {
    pub proposed_start: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleDecision {
    /// Doctor's note shown to the patient with the decision.
    pub note: Option<String>,
}
