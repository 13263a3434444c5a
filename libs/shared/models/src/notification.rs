// libs/shared/models/src/notification.rs
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Appointment,
    Reschedule,
    System,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Info => write!(f, "info"),
            NotificationKind::Appointment => write!(f, "appointment"),
            NotificationKind::Reschedule => write!(f, "reschedule"),
            NotificationKind::System => write!(f, "system"),
        }
    }
}
