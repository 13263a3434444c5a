pub mod appointment;
pub mod availability;
pub mod error;
pub mod notification;
pub mod reschedule;

pub use appointment::*;
pub use availability::*;
pub use error::*;
pub use notification::*;
pub use reschedule::*;
