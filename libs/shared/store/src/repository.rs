// libs/shared/store/src/repository.rs
//
// Collaborator seams for the scheduling core. Storage technology is out of
// scope; embedding services provide implementations backed by their own
// database, and the `memory` module provides reference implementations used
// by tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use uuid::Uuid;

use shared_models::{
    Appointment, DoctorAvailability, RescheduleOption, RescheduleRequest, SchedulingError,
};

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError>;

    /// Commit path for new bookings. The overlap re-check (doctor and
    /// patient, non-cancelled/non-rejected statuses only) and the insert
    /// must happen inside one transaction or equivalent critical section:
    /// of two concurrent bookings for the same slot exactly one may
    /// succeed, the other receives `SchedulingError::Conflict`.
    async fn insert_if_slot_free(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError>;

    async fn update(&self, appointment: Appointment) -> Result<Appointment, SchedulingError>;

    /// Non-cancelled/non-rejected appointments of the doctor overlapping
    /// `[start, end)`, minus `exclude` if given.
    async fn find_overlapping_for_doctor(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Same query keyed by patient, across all doctors.
    async fn find_overlapping_for_patient(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    /// Slot-blocking appointments of the doctor starting in `[from, to)`,
    /// ordered ascending. Batch input for slot generation.
    async fn find_in_horizon(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError>;
}

#[async_trait]
pub trait AvailabilityRepository: Send + Sync {
    /// Active weekly windows for a doctor, ordered by weekday then start.
    async fn get_active(&self, doctor_id: Uuid) -> Result<Vec<DoctorAvailability>, SchedulingError>;

    async fn find_active_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<Option<DoctorAvailability>, SchedulingError>;

    async fn insert(
        &self,
        availability: DoctorAvailability,
    ) -> Result<DoctorAvailability, SchedulingError>;

    /// Removes the active row for (doctor, weekday). Returns whether a row
    /// existed. Deactivating a day deletes it rather than flagging it.
    async fn delete_day(&self, doctor_id: Uuid, day: Weekday) -> Result<bool, SchedulingError>;
}

#[async_trait]
pub trait RescheduleRepository: Send + Sync {
    async fn insert_request(
        &self,
        request: RescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError>;

    async fn find_request(&self, id: Uuid) -> Result<Option<RescheduleRequest>, SchedulingError>;

    async fn update_request(
        &self,
        request: RescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError>;

    /// The one active (requested/proposed/patient-selected) request for an
    /// appointment, if any.
    async fn find_active_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<RescheduleRequest>, SchedulingError>;

    async fn insert_option(
        &self,
        option: RescheduleOption,
    ) -> Result<RescheduleOption, SchedulingError>;

    async fn find_option(&self, id: Uuid) -> Result<Option<RescheduleOption>, SchedulingError>;

    /// Options of a request, ordered by proposed start.
    async fn list_options(&self, request_id: Uuid)
        -> Result<Vec<RescheduleOption>, SchedulingError>;

    /// Clears `is_chosen` on every option of the request.
    async fn clear_chosen_options(&self, request_id: Uuid) -> Result<(), SchedulingError>;

    /// Patient selection commit: verifies the request is still in
    /// `Proposed`, clears all sibling `is_chosen` flags, marks the given
    /// option chosen and moves the request to `PatientSelected` - all as
    /// one atomic step, so concurrent selections admit a single winner.
    async fn select_chosen_option(
        &self,
        request_id: Uuid,
        option_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RescheduleRequest, SchedulingError>;
}
