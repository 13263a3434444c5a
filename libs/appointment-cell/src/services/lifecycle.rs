// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::{Appointment, AppointmentStatus, NotificationKind, SchedulingError};
use shared_store::{notify_best_effort, AppointmentRepository, Clock, NotificationSink};

use crate::models::CancelAppointmentRequest;
use crate::services::transitions::validate_transition;

/// Status transitions of a booked appointment.
///
/// Every transition stamps `updated_at` and notifies both parties;
/// notification failure never rolls back the committed change. Illegal
/// attempts come back as recoverable errors. Calendar-day guards compare
/// UTC dates, matching the UTC instants the appointments are stored in.
pub struct AppointmentLifecycleService {
    appointments: Arc<dyn AppointmentRepository>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl AppointmentLifecycleService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            appointments,
            notifier,
            clock,
            config,
        }
    }

    /// Front-desk check-in: allowed only on the scheduled day, within the
    /// configured window around the scheduled start.
    pub async fn check_in(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.load(appointment_id).await?;
        validate_transition(appointment.status, AppointmentStatus::Confirmed, "checked in")?;

        let now = self.clock.now_utc();
        if now.date_naive() != appointment.scheduled_at.date_naive() {
            return Err(SchedulingError::validation(
                "check-in is allowed only on the scheduled day",
            ));
        }

        let opens = appointment.scheduled_at
            - Duration::minutes(self.config.checkin_opens_minutes_before);
        let closes = appointment.scheduled_at
            + Duration::minutes(self.config.checkin_closes_minutes_after);
        if now < opens || now > closes {
            return Err(SchedulingError::validation(
                "check-in is allowed only close to the appointment time",
            ));
        }

        let updated = self
            .transition(appointment, AppointmentStatus::Confirmed, now)
            .await?;
        self.notify_both(
            &updated,
            "Checked in",
            &format!("Check-in recorded for the appointment at {}.", updated.scheduled_at),
        )
        .await;
        Ok(updated)
    }

    /// Cancellation is a status change with a mandatory reason; the record
    /// itself is kept.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        request: CancelAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        if request.reason.trim().is_empty() {
            return Err(SchedulingError::validation("a cancel reason is required"));
        }

        let mut appointment = self.load(appointment_id).await?;
        validate_transition(appointment.status, AppointmentStatus::Cancelled, "cancelled")?;

        let now = self.clock.now_utc();
        if appointment.scheduled_at <= now {
            return Err(SchedulingError::validation(
                "only future appointments can be cancelled",
            ));
        }

        debug!(
            "Cancelling appointment {} ({:?})",
            appointment_id, request.cancelled_by
        );
        appointment.cancel_reason = Some(request.reason.trim().to_string());
        let updated = self
            .transition(appointment, AppointmentStatus::Cancelled, now)
            .await?;
        self.notify_both(
            &updated,
            "Appointment cancelled",
            &format!("The appointment scheduled for {} was cancelled.", updated.scheduled_at),
        )
        .await;
        Ok(updated)
    }

    /// No-show may be marked on the scheduled day once the grace period
    /// past the scheduled start has elapsed.
    pub async fn mark_no_show(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.load(appointment_id).await?;
        validate_transition(appointment.status, AppointmentStatus::NoShow, "marked as no-show")?;

        let now = self.clock.now_utc();
        if now.date_naive() != appointment.scheduled_at.date_naive() {
            return Err(SchedulingError::validation(
                "no-show can be marked only on the scheduled day",
            ));
        }
        if now < appointment.scheduled_at + Duration::minutes(self.config.no_show_after_minutes) {
            return Err(SchedulingError::validation(format!(
                "too early to mark no-show, wait at least {} minutes after the scheduled time",
                self.config.no_show_after_minutes
            )));
        }

        warn!("Marking appointment {} as no-show", appointment_id);
        let updated = self
            .transition(appointment, AppointmentStatus::NoShow, now)
            .await?;
        self.notify_both(
            &updated,
            "Marked as no-show",
            &format!("The appointment at {} was marked as no-show.", updated.scheduled_at),
        )
        .await;
        Ok(updated)
    }

    pub async fn complete(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.load(appointment_id).await?;
        validate_transition(appointment.status, AppointmentStatus::Completed, "completed")?;

        let now = self.clock.now_utc();
        let updated = self
            .transition(appointment, AppointmentStatus::Completed, now)
            .await?;
        self.notify_both(
            &updated,
            "Visit completed",
            &format!("The visit scheduled for {} was completed.", updated.scheduled_at),
        )
        .await;
        Ok(updated)
    }

    /// Moves the appointment to its negotiated replacement slot.
    ///
    /// Only the reschedule negotiation calls this, after its own
    /// approval-time conflict re-check; no overlap validation happens here.
    pub async fn apply_reschedule(
        &self,
        appointment_id: Uuid,
        new_scheduled_at: DateTime<Utc>,
        new_location: Option<String>,
        reason: &str,
    ) -> Result<Appointment, SchedulingError> {
        let mut appointment = self.load(appointment_id).await?;
        validate_transition(appointment.status, AppointmentStatus::Rescheduled, "rescheduled")?;

        let now = self.clock.now_utc();
        appointment.scheduled_at = new_scheduled_at;
        if let Some(location) = new_location.filter(|l| !l.trim().is_empty()) {
            appointment.location = location;
        }
        appointment.reschedule_reason = Some(reason.to_string());

        let updated = self
            .transition(appointment, AppointmentStatus::Rescheduled, now)
            .await?;
        info!(
            "Appointment {} rescheduled to {}",
            updated.id, updated.scheduled_at
        );
        self.notify_both(
            &updated,
            "Appointment rescheduled",
            &format!("The appointment was moved to {}.", updated.scheduled_at),
        )
        .await;
        Ok(updated)
    }

    async fn load(&self, id: Uuid) -> Result<Appointment, SchedulingError> {
        self.appointments
            .find_by_id(id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("appointment {}", id)))
    }

    async fn transition(
        &self,
        mut appointment: Appointment,
        target: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Appointment {} transition {} -> {}",
            appointment.id, appointment.status, target
        );
        appointment.status = target;
        appointment.updated_at = now;
        self.appointments.update(appointment).await
    }

    async fn notify_both(&self, appointment: &Appointment, title: &str, body: &str) {
        for user in [appointment.patient_id, appointment.doctor_id] {
            notify_best_effort(
                self.notifier.as_ref(),
                user,
                NotificationKind::Appointment,
                title,
                body,
                Some("appointment"),
                Some(appointment.id),
            )
            .await;
        }
    }
}
