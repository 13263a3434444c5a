// libs/shared/store/src/memory.rs
//
// In-memory reference implementations of the repository seams. A single
// mutex per store stands in for the database transaction: the commit-path
// methods (`insert_if_slot_free`, `select_chosen_option`) do their
// check-then-act entirely under the lock, which is exactly the atomicity a
// SQL implementation must provide with serializable isolation or row locks.
use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use shared_models::{
    intervals_overlap, Appointment, DoctorAvailability, RescheduleOption, RescheduleRequest,
    RescheduleStatus, SchedulingError,
};

use crate::repository::{AppointmentRepository, AvailabilityRepository, RescheduleRepository};

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAppointmentRepository {
    inner: Mutex<HashMap<Uuid, Appointment>>,
}

impl InMemoryAppointmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn overlapping<F>(
        appointments: &HashMap<Uuid, Appointment>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
        key: F,
    ) -> Vec<Appointment>
    where
        F: Fn(&Appointment) -> bool,
    {
        let mut hits: Vec<Appointment> = appointments
            .values()
            .filter(|a| key(a))
            .filter(|a| Some(a.id) != exclude)
            .filter(|a| a.status.blocks_slot())
            .filter(|a| intervals_overlap(a.scheduled_at, a.scheduled_end(), start, end))
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.scheduled_at);
        hits
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryAppointmentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }

    async fn insert_if_slot_free(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();

        let start = appointment.scheduled_at;
        let end = appointment.scheduled_end();

        let doctor_clash = !Self::overlapping(&*inner, start, end, None, |a| {
            a.doctor_id == appointment.doctor_id
        })
        .is_empty();
        if doctor_clash {
            return Err(SchedulingError::conflict("doctor already booked in this interval"));
        }

        let patient_clash = !Self::overlapping(&*inner, start, end, None, |a| {
            a.patient_id == appointment.patient_id
        })
        .is_empty();
        if patient_clash {
            return Err(SchedulingError::conflict(
                "patient already has an appointment in this interval",
            ));
        }

        inner.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: Appointment) -> Result<Appointment, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.contains_key(&appointment.id) {
            return Err(SchedulingError::not_found(format!(
                "appointment {}",
                appointment.id
            )));
        }
        inner.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn find_overlapping_for_doctor(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::overlapping(&*inner, start, end, exclude, |a| {
            a.doctor_id == doctor_id
        }))
    }

    async fn find_overlapping_for_patient(
        &self,
        patient_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        Ok(Self::overlapping(&*inner, start, end, exclude, |a| {
            a.patient_id == patient_id
        }))
    }

    async fn find_in_horizon(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let mut hits: Vec<Appointment> = inner
            .values()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| a.status.blocks_slot())
            .filter(|a| a.scheduled_at >= from && a.scheduled_at < to)
            .cloned()
            .collect();
        hits.sort_by_key(|a| a.scheduled_at);
        Ok(hits)
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[derive(Debug, Default)]
pub struct InMemoryAvailabilityRepository {
    inner: Mutex<HashMap<Uuid, DoctorAvailability>>,
}

impl InMemoryAvailabilityRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityRepository for InMemoryAvailabilityRepository {
    async fn get_active(
        &self,
        doctor_id: Uuid,
    ) -> Result<Vec<DoctorAvailability>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<DoctorAvailability> = inner
            .values()
            .filter(|a| a.doctor_id == doctor_id && a.is_active)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.day_of_week.num_days_from_monday(), a.start_time));
        Ok(rows)
    }

    async fn find_active_for_day(
        &self,
        doctor_id: Uuid,
        day: Weekday,
    ) -> Result<Option<DoctorAvailability>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .values()
            .find(|a| a.doctor_id == doctor_id && a.day_of_week == day && a.is_active)
            .cloned())
    }

    async fn insert(
        &self,
        availability: DoctorAvailability,
    ) -> Result<DoctorAvailability, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(availability.id, availability.clone());
        Ok(availability)
    }

    async fn delete_day(&self, doctor_id: Uuid, day: Weekday) -> Result<bool, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.len();
        inner.retain(|_, a| !(a.doctor_id == doctor_id && a.day_of_week == day));
        Ok(inner.len() != before)
    }
}

// ==============================================================================
// RESCHEDULE NEGOTIATION
// ==============================================================================

#[derive(Debug, Default)]
struct RescheduleState {
    requests: HashMap<Uuid, RescheduleRequest>,
    options: HashMap<Uuid, RescheduleOption>,
}

#[derive(Debug, Default)]
pub struct InMemoryRescheduleRepository {
    inner: Mutex<RescheduleState>,
}

impl InMemoryRescheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RescheduleRepository for InMemoryRescheduleRepository {
    async fn insert_request(
        &self,
        request: RescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<RescheduleRequest>, SchedulingError> {
        Ok(self.inner.lock().unwrap().requests.get(&id).cloned())
    }

    async fn update_request(
        &self,
        request: RescheduleRequest,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.requests.contains_key(&request.id) {
            return Err(SchedulingError::not_found(format!(
                "reschedule request {}",
                request.id
            )));
        }
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find_active_for_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Option<RescheduleRequest>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .requests
            .values()
            .find(|r| r.appointment_id == appointment_id && r.status.is_active())
            .cloned())
    }

    async fn insert_option(
        &self,
        option: RescheduleOption,
    ) -> Result<RescheduleOption, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.requests.contains_key(&option.request_id) {
            return Err(SchedulingError::not_found(format!(
                "reschedule request {}",
                option.request_id
            )));
        }
        inner.options.insert(option.id, option.clone());
        Ok(option)
    }

    async fn find_option(&self, id: Uuid) -> Result<Option<RescheduleOption>, SchedulingError> {
        Ok(self.inner.lock().unwrap().options.get(&id).cloned())
    }

    async fn list_options(
        &self,
        request_id: Uuid,
    ) -> Result<Vec<RescheduleOption>, SchedulingError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<RescheduleOption> = inner
            .options
            .values()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect();
        rows.sort_by_key(|o| o.proposed_start);
        Ok(rows)
    }

    async fn clear_chosen_options(&self, request_id: Uuid) -> Result<(), SchedulingError> {
        let mut inner = self.inner.lock().unwrap();
        for option in inner.options.values_mut() {
            if option.request_id == request_id {
                option.is_chosen = false;
            }
        }
        Ok(())
    }

    async fn select_chosen_option(
        &self,
        request_id: Uuid,
        option_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<RescheduleRequest, SchedulingError> {
        let mut inner = self.inner.lock().unwrap();

        let status = inner
            .requests
            .get(&request_id)
            .map(|r| r.status)
            .ok_or_else(|| SchedulingError::not_found(format!("reschedule request {}", request_id)))?;

        // The status guard and the flag flip are one critical section; a
        // second concurrent selection observes PatientSelected and loses.
        if status != RescheduleStatus::Proposed {
            return Err(SchedulingError::IllegalRescheduleTransition {
                status,
                action: "selected",
            });
        }

        match inner.options.get(&option_id) {
            Some(o) if o.request_id == request_id => {}
            _ => return Err(SchedulingError::not_found(format!("option {}", option_id))),
        }

        for option in inner.options.values_mut() {
            if option.request_id == request_id {
                option.is_chosen = option.id == option_id;
            }
        }

        let request = inner.requests.get_mut(&request_id).unwrap();
        request.status = RescheduleStatus::PatientSelected;
        request.selected_option_id = Some(option_id);
        request.updated_at = now;
        Ok(request.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn appointment(doctor_id: Uuid, patient_id: Uuid, at: &str) -> Appointment {
        let at = utc(at);
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            scheduled_at: at,
            duration_minutes: 30,
            status: shared_models::AppointmentStatus::Approved,
            location: "Clinic".to_string(),
            reason: "checkup".to_string(),
            cancel_reason: None,
            reschedule_reason: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn request(appointment_id: Uuid) -> RescheduleRequest {
        let now = utc("2025-06-01T08:00:00Z");
        RescheduleRequest {
            id: Uuid::new_v4(),
            appointment_id,
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            status: RescheduleStatus::Proposed,
            reason: "trip".to_string(),
            preferred_windows: "mornings".to_string(),
            old_scheduled_at: utc("2025-06-02T10:00:00Z"),
            new_scheduled_at: None,
            selected_option_id: None,
            doctor_decision_note: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
            rejected_at: None,
            cancelled_at: None,
        }
    }

    fn option_for(request_id: Uuid, start: &str) -> RescheduleOption {
        let start = utc(start);
        RescheduleOption {
            id: Uuid::new_v4(),
            request_id,
            proposed_start: start,
            proposed_end: start + Duration::minutes(30),
            location: "Room 2".to_string(),
            is_chosen: false,
            created_at: utc("2025-06-01T08:00:00Z"),
        }
    }

    #[tokio::test]
    async fn insert_refuses_a_doctor_clash() {
        let repo = InMemoryAppointmentRepository::new();
        let doctor_id = Uuid::new_v4();
        repo.insert_if_slot_free(appointment(doctor_id, Uuid::new_v4(), "2025-06-02T10:00:00Z"))
            .await
            .unwrap();

        let result = repo
            .insert_if_slot_free(appointment(doctor_id, Uuid::new_v4(), "2025-06-02T10:15:00Z"))
            .await;

        assert_matches!(result, Err(SchedulingError::Conflict(_)));
    }

    #[tokio::test]
    async fn insert_refuses_a_patient_clash_across_doctors() {
        let repo = InMemoryAppointmentRepository::new();
        let patient_id = Uuid::new_v4();
        repo.insert_if_slot_free(appointment(Uuid::new_v4(), patient_id, "2025-06-02T10:00:00Z"))
            .await
            .unwrap();

        let result = repo
            .insert_if_slot_free(appointment(Uuid::new_v4(), patient_id, "2025-06-02T10:00:00Z"))
            .await;

        assert_matches!(result, Err(SchedulingError::Conflict(_)));
    }

    #[tokio::test]
    async fn updating_a_missing_appointment_is_not_found() {
        let repo = InMemoryAppointmentRepository::new();

        let result = repo
            .update(appointment(Uuid::new_v4(), Uuid::new_v4(), "2025-06-02T10:00:00Z"))
            .await;

        assert_matches!(result, Err(SchedulingError::NotFound(_)));
    }

    #[tokio::test]
    async fn horizon_fetch_is_bounded_and_sorted() {
        let repo = InMemoryAppointmentRepository::new();
        let doctor_id = Uuid::new_v4();
        for at in ["2025-06-03T10:00:00Z", "2025-06-02T10:00:00Z", "2025-06-20T10:00:00Z"] {
            repo.insert_if_slot_free(appointment(doctor_id, Uuid::new_v4(), at))
                .await
                .unwrap();
        }

        let hits = repo
            .find_in_horizon(doctor_id, utc("2025-06-01T00:00:00Z"), utc("2025-06-10T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(hits.len(), 2);
        assert!(hits[0].scheduled_at < hits[1].scheduled_at);
    }

    #[tokio::test]
    async fn select_chosen_option_is_exclusive() {
        let repo = InMemoryRescheduleRepository::new();
        let req = repo.insert_request(request(Uuid::new_v4())).await.unwrap();
        let a = repo
            .insert_option(option_for(req.id, "2025-06-09T09:00:00Z"))
            .await
            .unwrap();
        let b = repo
            .insert_option(option_for(req.id, "2025-06-09T11:00:00Z"))
            .await
            .unwrap();

        repo.select_chosen_option(req.id, a.id, utc("2025-06-01T09:00:00Z"))
            .await
            .unwrap();

        // Re-selecting through the low-level flag reset then picking b.
        repo.clear_chosen_options(req.id).await.unwrap();
        let options = repo.list_options(req.id).await.unwrap();
        assert!(options.iter().all(|o| !o.is_chosen));

        // Status already moved on, so the guarded path refuses.
        let result = repo
            .select_chosen_option(req.id, b.id, utc("2025-06-01T09:05:00Z"))
            .await;
        assert_matches!(
            result,
            Err(SchedulingError::IllegalRescheduleTransition {
                status: RescheduleStatus::PatientSelected,
                ..
            })
        );
    }

    #[tokio::test]
    async fn foreign_option_cannot_be_selected() {
        let repo = InMemoryRescheduleRepository::new();
        let req = repo.insert_request(request(Uuid::new_v4())).await.unwrap();
        let other = repo.insert_request(request(Uuid::new_v4())).await.unwrap();
        let foreign = repo
            .insert_option(option_for(other.id, "2025-06-09T09:00:00Z"))
            .await
            .unwrap();

        let result = repo
            .select_chosen_option(req.id, foreign.id, utc("2025-06-01T09:00:00Z"))
            .await;

        assert_matches!(result, Err(SchedulingError::NotFound(_)));
    }

    #[tokio::test]
    async fn inactive_requests_are_invisible_to_the_active_lookup() {
        let repo = InMemoryRescheduleRepository::new();
        let appointment_id = Uuid::new_v4();
        let mut req = request(appointment_id);
        req.status = RescheduleStatus::Rejected;
        repo.insert_request(req).await.unwrap();

        let active = repo.find_active_for_appointment(appointment_id).await.unwrap();

        assert!(active.is_none());
    }
}
