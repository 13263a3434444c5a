// libs/scheduling-cell/src/services/slots.rs
use chrono::{DateTime, Duration, Datelike, LocalResult, NaiveDate, TimeZone, Utc, Weekday};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::{intervals_overlap, Appointment, DoctorAvailability, SchedulingError};
use shared_store::{AppointmentRepository, AvailabilityRepository, Clock};

use crate::models::AvailableSlot;

/// Derives concrete bookable slots from recurring weekly availability.
pub struct SlotGenerator {
    availability: Arc<dyn AvailabilityRepository>,
    appointments: Arc<dyn AppointmentRepository>,
    clock: Arc<dyn Clock>,
    config: SchedulingConfig,
}

impl SlotGenerator {
    pub fn new(
        availability: Arc<dyn AvailabilityRepository>,
        appointments: Arc<dyn AppointmentRepository>,
        clock: Arc<dyn Clock>,
        config: SchedulingConfig,
    ) -> Self {
        Self {
            availability,
            appointments,
            clock,
            config,
        }
    }

    /// Candidate slots for a doctor over `[from_date, from_date + horizon_days]`.
    ///
    /// Availability windows are clinic wall-clock; each calendar day is
    /// resolved to UTC independently through `clinic_tz`, so a DST
    /// transition inside the horizon shifts only the days it affects.
    /// Candidates that do not start strictly after `now` are dropped,
    /// including one starting at the current instant: the booking commit
    /// accepts only strictly future starts, so such a candidate could never
    /// be taken. Candidates overlapping an existing slot-blocking
    /// appointment are dropped too. Output is ascending by start; a doctor
    /// with no active availability yields an empty list.
    pub async fn generate_slots<Tz>(
        &self,
        doctor_id: Uuid,
        from_date: NaiveDate,
        horizon_days: i64,
        clinic_tz: &Tz,
    ) -> Result<Vec<AvailableSlot>, SchedulingError>
    where
        Tz: TimeZone + Send + Sync,
        Tz::Offset: Send,
    {
        if horizon_days < 0 {
            return Err(SchedulingError::validation("horizon must not be negative"));
        }

        let windows = self.availability.get_active(doctor_id).await?;
        if windows.is_empty() {
            debug!("Doctor {} has no active availability", doctor_id);
            return Ok(vec![]);
        }

        let mut by_day: HashMap<Weekday, Vec<&DoctorAvailability>> = HashMap::new();
        for window in &windows {
            by_day.entry(window.day_of_week).or_default().push(window);
        }

        // One batched fetch for the whole horizon; the bounds carry a day
        // of slack on each side so no timezone offset can push a booked
        // appointment outside the fetched range.
        let fetch_from = from_date.and_hms_opt(0, 0, 0).unwrap().and_utc() - Duration::days(1);
        let fetch_to = from_date.and_hms_opt(0, 0, 0).unwrap().and_utc()
            + Duration::days(horizon_days + 2);
        let booked = self
            .appointments
            .find_in_horizon(doctor_id, fetch_from, fetch_to)
            .await?;

        let now = self.clock.now_utc();
        let duration = Duration::minutes(self.config.default_duration_minutes);
        let step = Duration::minutes(self.config.slot_step_minutes);

        let mut slots = Vec::new();
        for offset in 0..=horizon_days {
            let date = from_date + Duration::days(offset);
            let Some(day_windows) = by_day.get(&date.weekday()) else {
                continue;
            };

            for &window in day_windows {
                self.fill_window(
                    &mut slots, doctor_id, date, window, clinic_tz, now, duration, step, &booked,
                );
            }
        }

        slots.sort_by_key(|s| s.start);
        debug!("Generated {} slots for doctor {}", slots.len(), doctor_id);
        Ok(slots)
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_window<Tz>(
        &self,
        slots: &mut Vec<AvailableSlot>,
        doctor_id: Uuid,
        date: NaiveDate,
        window: &DoctorAvailability,
        clinic_tz: &Tz,
        now: DateTime<Utc>,
        duration: Duration,
        step: Duration,
        booked: &[Appointment],
    ) where
        Tz: TimeZone,
    {
        let mut wall = window.start_time;
        loop {
            let (slot_end_wall, wrapped) = wall.overflowing_add_signed(duration);
            if wrapped != 0 || slot_end_wall > window.end_time {
                break;
            }

            // Resolved per candidate: during fall-back the earlier instant
            // wins, spring-forward gaps produce no slot at all.
            let start = match clinic_tz.from_local_datetime(&date.and_time(wall)) {
                LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
                LocalResult::None => None,
            };

            if let Some(start) = start {
                let end = start + duration;
                let fresh = start > now;
                let free = !booked
                    .iter()
                    .any(|a| intervals_overlap(a.scheduled_at, a.scheduled_end(), start, end));

                if fresh && free {
                    slots.push(AvailableSlot {
                        doctor_id,
                        start,
                        end,
                        duration_minutes: self.config.default_duration_minutes,
                    });
                }
            }

            let (next, wrapped) = wall.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            wall = next;
        }
    }
}
