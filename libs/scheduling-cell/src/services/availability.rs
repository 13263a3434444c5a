// libs/scheduling-cell/src/services/availability.rs
use chrono::Weekday;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_models::{DoctorAvailability, SchedulingError};
use shared_store::AvailabilityRepository;

use crate::models::SetAvailabilityRequest;

/// Doctor-edited weekly open hours.
///
/// Keeps at most one active window per (doctor, weekday): setting a day
/// replaces whatever was there, deactivating a day deletes the row.
pub struct AvailabilityService {
    availability: Arc<dyn AvailabilityRepository>,
}

impl AvailabilityService {
    pub fn new(availability: Arc<dyn AvailabilityRepository>) -> Self {
        Self { availability }
    }

    pub async fn get_active(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<DoctorAvailability>, SchedulingError> {
        self.availability.get_active(doctor_id).await
    }

    /// Create or replace the open-hours window for one weekday.
    pub async fn set_day(
        &self,
        doctor_id: Uuid,
        request: SetAvailabilityRequest,
    ) -> Result<DoctorAvailability, SchedulingError> {
        debug!(
            "Setting availability for doctor {} on {:?}: {} - {}",
            doctor_id, request.day_of_week, request.start_time, request.end_time
        );

        if request.start_time >= request.end_time {
            return Err(SchedulingError::validation(
                "start time must be before end time",
            ));
        }

        // Replace-in-place keeps the one-active-row-per-day invariant
        // without relying on a storage-level unique index.
        if self
            .availability
            .find_active_for_day(doctor_id, request.day_of_week)
            .await?
            .is_some()
        {
            self.availability
                .delete_day(doctor_id, request.day_of_week)
                .await?;
        }

        self.availability
            .insert(DoctorAvailability {
                id: Uuid::new_v4(),
                doctor_id,
                day_of_week: request.day_of_week,
                start_time: request.start_time,
                end_time: request.end_time,
                is_active: true,
            })
            .await
    }

    /// Deactivate a weekday. Returns whether a window existed.
    pub async fn clear_day(&self, doctor_id: Uuid, day: Weekday) -> Result<bool, SchedulingError> {
        debug!("Clearing availability for doctor {} on {:?}", doctor_id, day);
        self.availability.delete_day(doctor_id, day).await
    }
}
