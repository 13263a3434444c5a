use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use appointment_cell::{AppointmentLifecycleService, CancelAppointmentRequest};
use shared_config::SchedulingConfig;
use shared_models::{Appointment, AppointmentStatus, CancelledBy, SchedulingError};
use shared_store::{
    AppointmentRepository, FixedClock, InMemoryAppointmentRepository, RecordingNotificationSink,
};

struct Harness {
    appointments: Arc<InMemoryAppointmentRepository>,
    notifier: Arc<RecordingNotificationSink>,
    clock: Arc<FixedClock>,
    service: AppointmentLifecycleService,
}

fn utc(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn harness(now: &str) -> Harness {
    let appointments = Arc::new(InMemoryAppointmentRepository::new());
    let notifier = Arc::new(RecordingNotificationSink::new());
    let clock = Arc::new(FixedClock::new(utc(now)));
    let service = AppointmentLifecycleService::new(
        Arc::clone(&appointments) as Arc<_>,
        Arc::clone(&notifier) as Arc<_>,
        Arc::clone(&clock) as Arc<_>,
        SchedulingConfig::default(),
    );
    Harness {
        appointments,
        notifier,
        clock,
        service,
    }
}

async fn seed(h: &Harness, at: &str, status: AppointmentStatus) -> Appointment {
    let at = utc(at);
    h.appointments
        .insert_if_slot_free(Appointment {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            scheduled_at: at,
            duration_minutes: 30,
            status,
            location: "Clinic".to_string(),
            reason: "checkup".to_string(),
            cancel_reason: None,
            reschedule_reason: None,
            created_at: at,
            updated_at: at,
        })
        .await
        .unwrap()
}

fn cancel_request() -> CancelAppointmentRequest {
    CancelAppointmentRequest {
        reason: "Family emergency".to_string(),
        cancelled_by: CancelledBy::Patient,
    }
}

// ==============================================================================
// CHECK-IN
// ==============================================================================

#[tokio::test]
async fn check_in_inside_the_window_confirms() {
    let h = harness("2025-06-02T09:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let updated = h.service.check_in(appointment.id).await.unwrap();

    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn check_in_opens_two_hours_before() {
    let h = harness("2025-06-02T07:59:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.check_in(appointment.id).await;
    assert_matches!(result, Err(SchedulingError::Validation(_)));

    h.clock.set(utc("2025-06-02T08:00:00Z"));
    assert!(h.service.check_in(appointment.id).await.is_ok());
}

#[tokio::test]
async fn check_in_closes_thirty_minutes_after() {
    let h = harness("2025-06-02T10:31:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.check_in(appointment.id).await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn check_in_on_another_day_is_rejected() {
    let h = harness("2025-06-01T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.check_in(appointment.id).await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn completed_appointment_cannot_check_in_again() {
    let h = harness("2025-06-02T09:45:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Completed).await;

    let result = h.service.check_in(appointment.id).await;

    assert_matches!(
        result,
        Err(SchedulingError::IllegalAppointmentTransition { .. })
    );
}

#[tokio::test]
async fn rescheduled_appointment_can_check_in() {
    let h = harness("2025-06-02T09:45:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Rescheduled).await;

    let updated = h.service.check_in(appointment.id).await.unwrap();

    assert_eq!(updated.status, AppointmentStatus::Confirmed);
}

// ==============================================================================
// CANCELLATION
// ==============================================================================

#[tokio::test]
async fn cancelling_a_future_appointment_keeps_the_record() {
    let h = harness("2025-06-01T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Pending).await;

    let updated = h
        .service
        .cancel(appointment.id, cancel_request())
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Cancelled);
    assert_eq!(updated.cancel_reason.as_deref(), Some("Family emergency"));

    let stored = h
        .appointments
        .find_by_id(appointment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn cancelling_requires_a_reason() {
    let h = harness("2025-06-01T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Pending).await;

    let result = h
        .service
        .cancel(
            appointment.id,
            CancelAppointmentRequest {
                reason: "".to_string(),
                cancelled_by: CancelledBy::Staff,
            },
        )
        .await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn past_appointments_cannot_be_cancelled() {
    let h = harness("2025-06-03T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.cancel(appointment.id, cancel_request()).await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

#[tokio::test]
async fn cancelling_twice_is_an_illegal_transition() {
    let h = harness("2025-06-01T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Cancelled).await;

    let result = h.service.cancel(appointment.id, cancel_request()).await;

    assert_matches!(
        result,
        Err(SchedulingError::IllegalAppointmentTransition { .. })
    );
}

// ==============================================================================
// NO-SHOW
// ==============================================================================

#[tokio::test]
async fn no_show_waits_out_the_grace_period() {
    let h = harness("2025-06-02T10:10:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.mark_no_show(appointment.id).await;
    assert_matches!(result, Err(SchedulingError::Validation(_)));

    h.clock.set(utc("2025-06-02T10:16:00Z"));
    let updated = h.service.mark_no_show(appointment.id).await.unwrap();
    assert_eq!(updated.status, AppointmentStatus::NoShow);
}

#[tokio::test]
async fn no_show_cannot_be_marked_the_next_day() {
    let h = harness("2025-06-03T09:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.mark_no_show(appointment.id).await;

    assert_matches!(result, Err(SchedulingError::Validation(_)));
}

// ==============================================================================
// COMPLETION
// ==============================================================================

#[tokio::test]
async fn confirmed_visit_completes() {
    let h = harness("2025-06-02T10:40:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Confirmed).await;

    let updated = h.service.complete(appointment.id).await.unwrap();

    assert_eq!(updated.status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn completion_requires_a_prior_check_in() {
    let h = harness("2025-06-02T10:40:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let result = h.service.complete(appointment.id).await;

    assert_matches!(
        result,
        Err(SchedulingError::IllegalAppointmentTransition { .. })
    );
}

// ==============================================================================
// RESCHEDULE APPLICATION
// ==============================================================================

#[tokio::test]
async fn apply_reschedule_moves_the_appointment() {
    let h = harness("2025-06-01T10:00:00Z");
    let appointment = seed(&h, "2025-06-02T10:00:00Z", AppointmentStatus::Approved).await;

    let updated = h
        .service
        .apply_reschedule(
            appointment.id,
            utc("2025-06-09T11:00:00Z"),
            Some("Room 2".to_string()),
            "travel",
        )
        .await
        .unwrap();

    assert_eq!(updated.status, AppointmentStatus::Rescheduled);
    assert_eq!(updated.scheduled_at, utc("2025-06-09T11:00:00Z"));
    assert_eq!(updated.location, "Room 2");
    assert_eq!(updated.reschedule_reason.as_deref(), Some("travel"));
}

#[tokio::test]
async fn missing_appointment_is_reported_as_not_found() {
    let h = harness("2025-06-01T10:00:00Z");

    let result = h.service.complete(Uuid::new_v4()).await;

    assert_matches!(result, Err(SchedulingError::NotFound(_)));
}
