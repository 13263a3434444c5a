// libs/scheduling-cell/src/services/conflict.rs
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::SchedulingError;
use shared_store::AppointmentRepository;

/// Overlap detection against existing non-cancelled, non-rejected bookings.
///
/// The same checker serves candidate validation and the pre-commit re-check;
/// the commit itself re-runs the overlap query atomically inside
/// `AppointmentRepository::insert_if_slot_free`.
pub struct ConflictChecker {
    appointments: Arc<dyn AppointmentRepository>,
}

impl ConflictChecker {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    /// True when `[start, end)` collides with another booking for the
    /// doctor (double-booking) or for the patient (overlapping visits with
    /// any doctor). `exclude` skips the appointment being moved.
    pub async fn has_conflict(
        &self,
        doctor_id: Uuid,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        Ok(self
            .doctor_has_conflict(doctor_id, start, end, exclude)
            .await?
            || self
                .patient_has_conflict(patient_id, start, end, exclude)
                .await?)
    }

    pub async fn doctor_has_conflict(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        validate_interval(start, end)?;
        debug!("Checking doctor {} conflicts in [{}, {})", doctor_id, start, end);

        let clashes = self
            .appointments
            .find_overlapping_for_doctor(doctor_id, start, end, exclude)
            .await?;

        if !clashes.is_empty() {
            warn!(
                "Conflict for doctor {}: {} overlapping appointment(s)",
                doctor_id,
                clashes.len()
            );
        }
        Ok(!clashes.is_empty())
    }

    pub async fn patient_has_conflict(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<bool, SchedulingError> {
        validate_interval(start, end)?;

        let clashes = self
            .appointments
            .find_overlapping_for_patient(patient_id, start, end, exclude)
            .await?;
        Ok(!clashes.is_empty())
    }
}

fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), SchedulingError> {
    if end <= start {
        return Err(SchedulingError::validation("interval end must be after start"));
    }
    Ok(())
}
