// libs/appointment-cell/src/services/booking.rs
use chrono::{Datelike, Duration, TimeZone};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use scheduling_cell::ConflictChecker;
use shared_config::SchedulingConfig;
use shared_models::{Appointment, AppointmentStatus, NotificationKind, SchedulingError};
use shared_store::{
    notify_best_effort, AppointmentRepository, AvailabilityRepository, Clock, NotificationSink,
};

use crate::models::{BookAppointmentRequest, BookedBy};

/// Booking commit path.
///
/// Slot listing and booking are separated in time, so everything checked at
/// listing time is re-validated here, and the final overlap check runs
/// atomically with the insert inside the repository. The loser of a
/// concurrent race gets `Conflict`, never a silent overwrite.
pub struct AppointmentBookingService {
    appointments: Arc<dyn AppointmentRepository>,
    availability: Arc<dyn AvailabilityRepository>,
    conflicts: ConflictChecker,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl AppointmentBookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        availability: Arc<dyn AvailabilityRepository>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        let conflicts = ConflictChecker::new(Arc::clone(&appointments));
        Self {
            appointments,
            availability,
            conflicts,
            notifier,
            clock,
            config,
        }
    }

    pub async fn book<Tz>(
        &self,
        request: BookAppointmentRequest,
        clinic_tz: &Tz,
    ) -> Result<Appointment, SchedulingError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Send,
    {
        debug!(
            "Booking appointment for patient {} with doctor {} at {}",
            request.patient_id, request.doctor_id, request.scheduled_at
        );

        let now = self.clock.now_utc();
        if request.scheduled_at <= now {
            return Err(SchedulingError::validation("cannot schedule in the past"));
        }
        if request.reason.trim().is_empty() {
            return Err(SchedulingError::validation("a visit reason is required"));
        }

        self.validate_within_working_hours(&request, clinic_tz)
            .await?;

        let start = request.scheduled_at;
        let end = start + Duration::minutes(self.config.default_duration_minutes);

        // Early check for a friendly error; the authoritative one happens
        // atomically with the insert below.
        if self
            .conflicts
            .has_conflict(request.doctor_id, request.patient_id, start, end, None)
            .await?
        {
            return Err(SchedulingError::conflict("selected slot is no longer available"));
        }

        let status = match request.booked_by {
            BookedBy::Staff => AppointmentStatus::Approved,
            BookedBy::Patient => AppointmentStatus::Pending,
        };

        let appointment = self
            .appointments
            .insert_if_slot_free(Appointment {
                id: Uuid::new_v4(),
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                scheduled_at: start,
                duration_minutes: self.config.default_duration_minutes as i32,
                status,
                location: request.location.unwrap_or_else(|| "Clinic".to_string()),
                reason: request.reason.trim().to_string(),
                cancel_reason: None,
                reschedule_reason: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        info!(
            "Appointment {} booked for {} ({})",
            appointment.id, appointment.scheduled_at, appointment.status
        );

        notify_best_effort(
            self.notifier.as_ref(),
            appointment.patient_id,
            NotificationKind::Appointment,
            "Appointment scheduled",
            &format!("Your clinic appointment was scheduled for {}.", appointment.scheduled_at),
            Some("appointment"),
            Some(appointment.id),
        )
        .await;
        notify_best_effort(
            self.notifier.as_ref(),
            appointment.doctor_id,
            NotificationKind::Appointment,
            "New appointment",
            &format!("A new appointment was scheduled for {}.", appointment.scheduled_at),
            Some("appointment"),
            Some(appointment.id),
        )
        .await;

        Ok(appointment)
    }

    /// Fail-closed availability validation: no active window for the day,
    /// or a candidate outside or misaligned within the window, rejects the
    /// booking.
    async fn validate_within_working_hours<Tz>(
        &self,
        request: &BookAppointmentRequest,
        clinic_tz: &Tz,
    ) -> Result<(), SchedulingError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Send,
    {
        let local = request.scheduled_at.with_timezone(clinic_tz);
        let wall = local.naive_local();

        let window = self
            .availability
            .find_active_for_day(request.doctor_id, wall.weekday())
            .await?
            .ok_or_else(|| {
                SchedulingError::validation("selected time is outside the doctor's working hours")
            })?;

        let start_offset = wall.time().signed_duration_since(window.start_time);
        let (slot_end, wrapped) = wall
            .time()
            .overflowing_add_signed(Duration::minutes(self.config.default_duration_minutes));

        if start_offset < Duration::zero() || wrapped != 0 || slot_end > window.end_time {
            return Err(SchedulingError::validation(
                "selected time is outside the doctor's working hours",
            ));
        }

        if start_offset.num_seconds() % (self.config.slot_step_minutes * 60) != 0 {
            return Err(SchedulingError::validation(
                "selected slot is not aligned to the slot step",
            ));
        }

        Ok(())
    }
}
