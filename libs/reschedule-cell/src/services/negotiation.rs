// libs/reschedule-cell/src/services/negotiation.rs
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::AppointmentLifecycleService;
use scheduling_cell::ConflictChecker;
use shared_models::{
    Appointment, AppointmentStatus, NotificationKind, RescheduleOption, RescheduleRequest,
    RescheduleStatus, SchedulingError,
};
use shared_store::{notify_best_effort, AppointmentRepository, Clock, NotificationSink, RescheduleRepository};

use crate::models::{CreateRescheduleRequest, ProposeOptionRequest, RescheduleDecision};

/// Multi-party reschedule negotiation.
///
/// Patient requests, staff or doctor proposes options, patient selects one,
/// doctor decides. Every step before approval is pure negotiation state;
/// the appointment itself is mutated only by `approve`, and only after a
/// fresh conflict check.
pub struct RescheduleNegotiationService {
    reschedules: Arc<dyn RescheduleRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    conflicts: ConflictChecker,
    lifecycle: Arc<AppointmentLifecycleService>,
    notifier: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
}

impl RescheduleNegotiationService {
    pub fn new(
        reschedules: Arc<dyn RescheduleRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        lifecycle: Arc<AppointmentLifecycleService>,
        notifier: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let conflicts = ConflictChecker::new(Arc::clone(&appointments));
        Self {
            reschedules,
            appointments,
            conflicts,
            lifecycle,
            notifier,
            clock,
        }
    }

    /// Patient opens a negotiation for a future, non-cancelled,
    /// non-completed appointment. One active request per appointment.
    pub async fn create_request(
        &self,
        patient_id: Uuid,
        request: CreateRescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError> {
        if request.reason.trim().is_empty() {
            return Err(SchedulingError::validation("a reschedule reason is required"));
        }
        if request.preferred_windows.trim().is_empty() {
            return Err(SchedulingError::validation("preferred time windows are required"));
        }

        let appointment = self
            .load_appointment_for_patient(request.appointment_id, patient_id)
            .await?;

        if matches!(
            appointment.status,
            AppointmentStatus::Cancelled | AppointmentStatus::Completed
        ) {
            return Err(SchedulingError::validation(
                "this appointment can no longer be rescheduled",
            ));
        }

        let now = self.clock.now_utc();
        if appointment.scheduled_at <= now {
            return Err(SchedulingError::validation(
                "only future appointments can be rescheduled",
            ));
        }

        if self
            .reschedules
            .find_active_for_appointment(appointment.id)
            .await?
            .is_some()
        {
            return Err(SchedulingError::conflict(
                "an active reschedule request already exists for this appointment",
            ));
        }

        let created = self
            .reschedules
            .insert_request(RescheduleRequest {
                id: Uuid::new_v4(),
                appointment_id: appointment.id,
                patient_id,
                doctor_id: appointment.doctor_id,
                status: RescheduleStatus::Requested,
                reason: request.reason.trim().to_string(),
                preferred_windows: request.preferred_windows.trim().to_string(),
                old_scheduled_at: appointment.scheduled_at,
                new_scheduled_at: None,
                selected_option_id: None,
                doctor_decision_note: None,
                created_at: now,
                updated_at: now,
                approved_at: None,
                rejected_at: None,
                cancelled_at: None,
            })
            .await?;

        info!(
            "Reschedule request {} opened for appointment {}",
            created.id, created.appointment_id
        );
        notify_best_effort(
            self.notifier.as_ref(),
            created.doctor_id,
            NotificationKind::Reschedule,
            "Reschedule requested",
            "A patient asked to move an upcoming appointment.",
            Some("reschedule_request"),
            Some(created.id),
        )
        .await;
        Ok(created)
    }

    /// Staff or doctor adds a candidate slot. The first option moves the
    /// request from Requested to Proposed.
    pub async fn add_option(
        &self,
        proposer_id: Uuid,
        request_id: Uuid,
        option: ProposeOptionRequest,
    ) -> Result<RescheduleOption, SchedulingError> {
        let mut request = self.load_request(request_id).await?;

        if !matches!(
            request.status,
            RescheduleStatus::Requested | RescheduleStatus::Proposed
        ) {
            return Err(SchedulingError::IllegalRescheduleTransition {
                status: request.status,
                action: "extended with options",
            });
        }

        let now = self.clock.now_utc();
        if option.proposed_end <= option.proposed_start {
            return Err(SchedulingError::validation("option end must be after its start"));
        }
        if option.proposed_start <= now {
            return Err(SchedulingError::validation("option must lie in the future"));
        }
        if option.location.trim().is_empty() {
            return Err(SchedulingError::validation("option location is required"));
        }

        // The appointment being moved does not count against its own
        // replacement slots.
        if self
            .conflicts
            .doctor_has_conflict(
                request.doctor_id,
                option.proposed_start,
                option.proposed_end,
                Some(request.appointment_id),
            )
            .await?
        {
            return Err(SchedulingError::conflict(
                "this option overlaps another appointment",
            ));
        }

        debug!(
            "User {} proposing option {} - {} on request {}",
            proposer_id, option.proposed_start, option.proposed_end, request_id
        );

        let created = self
            .reschedules
            .insert_option(RescheduleOption {
                id: Uuid::new_v4(),
                request_id,
                proposed_start: option.proposed_start,
                proposed_end: option.proposed_end,
                location: option.location.trim().to_string(),
                is_chosen: false,
                created_at: now,
            })
            .await?;

        if request.status == RescheduleStatus::Requested {
            request.status = RescheduleStatus::Proposed;
        }
        request.updated_at = now;
        self.reschedules.update_request(request.clone()).await?;

        notify_best_effort(
            self.notifier.as_ref(),
            request.patient_id,
            NotificationKind::Reschedule,
            "Reschedule options proposed",
            "New time options are available for your reschedule request.",
            Some("reschedule_request"),
            Some(request.id),
        )
        .await;
        Ok(created)
    }

    /// Patient picks exactly one proposed option. The Proposed-status
    /// guard, the sibling-flag clearing and the chosen-flag set happen as
    /// one atomic repository step, so a concurrent second selection loses.
    pub async fn select_option(
        &self,
        patient_id: Uuid,
        request_id: Uuid,
        option_id: Uuid,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let request = self.load_request(request_id).await?;
        if request.patient_id != patient_id {
            return Err(SchedulingError::not_found(format!(
                "reschedule request {}",
                request_id
            )));
        }

        let updated = self
            .reschedules
            .select_chosen_option(request_id, option_id, self.clock.now_utc())
            .await?;

        info!(
            "Patient selected option {} on reschedule request {}",
            option_id, request_id
        );
        notify_best_effort(
            self.notifier.as_ref(),
            updated.doctor_id,
            NotificationKind::Reschedule,
            "Reschedule option selected",
            "The patient picked a replacement slot and awaits your decision.",
            Some("reschedule_request"),
            Some(updated.id),
        )
        .await;
        Ok(updated)
    }

    /// Doctor approval: re-checks conflicts at decision time, then - and
    /// only then - moves the appointment and closes the request.
    pub async fn approve(
        &self,
        doctor_id: Uuid,
        request_id: Uuid,
        decision: RescheduleDecision,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut request = self.load_request_for_doctor(request_id, doctor_id).await?;

        let option_id = match (request.status, request.selected_option_id) {
            (RescheduleStatus::PatientSelected, Some(option_id)) => option_id,
            _ => {
                return Err(SchedulingError::IllegalRescheduleTransition {
                    status: request.status,
                    action: "approved",
                })
            }
        };

        let option = self
            .reschedules
            .find_option(option_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("option {}", option_id)))?;

        // Time may have passed since the option was proposed and selected;
        // the earlier checks are not trusted here.
        if self
            .conflicts
            .doctor_has_conflict(
                request.doctor_id,
                option.proposed_start,
                option.proposed_end,
                Some(request.appointment_id),
            )
            .await?
        {
            warn!(
                "Approval of reschedule request {} blocked by a fresh conflict",
                request_id
            );
            return Err(SchedulingError::conflict(
                "the selected option now overlaps another appointment",
            ));
        }

        self.lifecycle
            .apply_reschedule(
                request.appointment_id,
                option.proposed_start,
                Some(option.location.clone()),
                &request.reason,
            )
            .await?;

        let now = self.clock.now_utc();
        request.status = RescheduleStatus::Approved;
        request.new_scheduled_at = Some(option.proposed_start);
        request.doctor_decision_note = decision
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        request.approved_at = Some(now);
        request.updated_at = now;
        let updated = self.reschedules.update_request(request).await?;

        info!(
            "Reschedule request {} approved, appointment {} moved to {}",
            updated.id, updated.appointment_id, option.proposed_start
        );
        notify_best_effort(
            self.notifier.as_ref(),
            updated.patient_id,
            NotificationKind::Reschedule,
            "Reschedule approved",
            &format!("Your appointment was moved to {}.", option.proposed_start),
            Some("reschedule_request"),
            Some(updated.id),
        )
        .await;
        Ok(updated)
    }

    /// Doctor rejection: the request closes, the appointment keeps its
    /// original slot.
    pub async fn reject(
        &self,
        doctor_id: Uuid,
        request_id: Uuid,
        decision: RescheduleDecision,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut request = self.load_request_for_doctor(request_id, doctor_id).await?;

        if request.status != RescheduleStatus::PatientSelected {
            return Err(SchedulingError::IllegalRescheduleTransition {
                status: request.status,
                action: "rejected",
            });
        }

        let now = self.clock.now_utc();
        request.status = RescheduleStatus::Rejected;
        request.doctor_decision_note = Some(
            decision
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Rejected by doctor.".to_string()),
        );
        request.rejected_at = Some(now);
        request.updated_at = now;
        let updated = self.reschedules.update_request(request).await?;

        notify_best_effort(
            self.notifier.as_ref(),
            updated.patient_id,
            NotificationKind::Reschedule,
            "Reschedule rejected",
            "Your reschedule request was declined; the original time stands.",
            Some("reschedule_request"),
            Some(updated.id),
        )
        .await;
        Ok(updated)
    }

    /// Patient withdraws before selecting; allowed from Requested or
    /// Proposed.
    pub async fn withdraw(
        &self,
        patient_id: Uuid,
        request_id: Uuid,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut request = self.load_request(request_id).await?;
        if request.patient_id != patient_id {
            return Err(SchedulingError::not_found(format!(
                "reschedule request {}",
                request_id
            )));
        }

        if !matches!(
            request.status,
            RescheduleStatus::Requested | RescheduleStatus::Proposed
        ) {
            return Err(SchedulingError::IllegalRescheduleTransition {
                status: request.status,
                action: "withdrawn",
            });
        }

        let now = self.clock.now_utc();
        request.status = RescheduleStatus::Cancelled;
        request.cancelled_at = Some(now);
        request.updated_at = now;
        let updated = self.reschedules.update_request(request).await?;

        notify_best_effort(
            self.notifier.as_ref(),
            updated.doctor_id,
            NotificationKind::Reschedule,
            "Reschedule request withdrawn",
            "The patient withdrew their reschedule request.",
            Some("reschedule_request"),
            Some(updated.id),
        )
        .await;
        Ok(updated)
    }

    pub async fn list_options(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<RescheduleOption>, SchedulingError> {
        self.load_request(request_id).await?;
        self.reschedules.list_options(request_id).await
    }

    async fn load_request(&self, id: Uuid) -> Result<RescheduleRequest, SchedulingError> {
        self.reschedules
            .find_request(id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("reschedule request {}", id)))
    }

    async fn load_request_for_doctor(
        &self,
        id: Uuid,
        doctor_id: Uuid,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let request = self.load_request(id).await?;
        if request.doctor_id != doctor_id {
            return Err(SchedulingError::not_found(format!("reschedule request {}", id)));
        }
        Ok(request)
    }

    async fn load_appointment_for_patient(
        &self,
        appointment_id: Uuid,
        patient_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .appointments
            .find_by_id(appointment_id)
            .await?
            .ok_or_else(|| SchedulingError::not_found(format!("appointment {}", appointment_id)))?;
        if appointment.patient_id != patient_id {
            return Err(SchedulingError::not_found(format!(
                "appointment {}",
                appointment_id
            )));
        }
        Ok(appointment)
    }
}
