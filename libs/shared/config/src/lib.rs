use std::env;
use tracing::warn;

/// Tunable scheduling constants.
///
/// The check-in window and no-show threshold mirror current clinic policy
/// and are awaiting product confirmation, so they are configuration rather
/// than literals in the cells that consume them.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// Spacing between generated slot starts, minutes.
    pub slot_step_minutes: i64,
    /// Visit length, minutes. All bookings currently share one duration.
    pub default_duration_minutes: i64,
    /// How far ahead slot listings look, days.
    pub horizon_days: i64,
    /// Check-in opens this many minutes before the scheduled start.
    pub checkin_opens_minutes_before: i64,
    /// Check-in closes this many minutes after the scheduled start.
    pub checkin_closes_minutes_after: i64,
    /// No-show may be marked once this many minutes have elapsed past the
    /// scheduled start.
    pub no_show_after_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            slot_step_minutes: 30,
            default_duration_minutes: 30,
            horizon_days: 14,
            checkin_opens_minutes_before: 120,
            checkin_closes_minutes_after: 30,
            no_show_after_minutes: 15,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();

        Self {
            slot_step_minutes: read_minutes("SCHEDULING_SLOT_STEP_MINUTES", defaults.slot_step_minutes),
            default_duration_minutes: read_minutes(
                "SCHEDULING_DURATION_MINUTES",
                defaults.default_duration_minutes,
            ),
            horizon_days: read_minutes("SCHEDULING_HORIZON_DAYS", defaults.horizon_days),
            checkin_opens_minutes_before: read_minutes(
                "SCHEDULING_CHECKIN_OPENS_MINUTES",
                defaults.checkin_opens_minutes_before,
            ),
            checkin_closes_minutes_after: read_minutes(
                "SCHEDULING_CHECKIN_CLOSES_MINUTES",
                defaults.checkin_closes_minutes_after,
            ),
            no_show_after_minutes: read_minutes(
                "SCHEDULING_NO_SHOW_AFTER_MINUTES",
                defaults.no_show_after_minutes,
            ),
        }
    }
}

fn read_minutes(key: &str, default: i64) -> i64 {
    match env::var(key) {
        Ok(raw) => match raw.parse::<i64>() {
            Ok(value) if value > 0 => value,
            _ => {
                warn!("{} has invalid value {:?}, using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
