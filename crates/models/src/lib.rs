//! Domain types for the appointment book.
//! - Records are serialized as camelCase JSON documents.
//! - Input types carry the validation rules applied before anything is stored or scheduled.

pub mod errors;
pub mod appointment;
pub mod service;
pub mod settings;
pub mod filter;

pub use appointment::{Appointment, NewAppointment};
pub use filter::{AppointmentFilter, TimeFilter};
pub use service::{NewService, Service};
pub use settings::{AppSettings, SmsSettings};
