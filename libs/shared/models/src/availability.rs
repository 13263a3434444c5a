// libs/shared/models/src/availability.rs
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One recurring weekly open-hours window for a doctor.
///
/// Times are clinic wall-clock; conversion to UTC happens at slot-generation
/// time, per calendar day. At most one active row may exist per
/// (doctor, weekday) - the availability service enforces this on write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_active: bool,
}
