//! Appointment reminder services.
//! - `storage` persists appointments, services, settings and the reminder journal.
//! - `scheduler` arms one-shot reminders; `delivery` sends them over the httpSMS API.
//! - `booking` is the surface the UI talks to; `bootstrap` wires everything for the binary.

pub mod errors;
pub mod storage;
pub mod formatter;
pub mod delivery;
pub mod scheduler;
pub mod booking;
pub mod bootstrap;
pub mod observability;

pub use booking::AppointmentBook;
pub use scheduler::{ReminderEvent, ReminderScheduler, ReminderState, ScheduleOutcome};
