//! Reminder text rendering.

use chrono::{Local, TimeZone};
use models::Appointment;

pub const CLIENT_NAME_TOKEN: &str = "[Client Name]";
pub const SERVICE_TOKEN: &str = "[Service]";
pub const TIME_TOKEN: &str = "[Time]";
pub const DATE_TOKEN: &str = "[Date]";

/// Render `template` for `appointment` in the host's local time zone.
pub fn render(template: &str, appointment: &Appointment) -> String {
    render_in(template, appointment, &Local)
}

/// Render with an explicit time zone. Every occurrence of each token is
/// replaced; any other bracketed text is left as written.
pub fn render_in<Tz>(template: &str, appointment: &Appointment, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let start = appointment.start.with_timezone(tz);
    // en-US: "3:30 PM", "Thursday, March 14"
    let time = start.format("%-I:%M %p").to_string();
    let date = start.format("%A, %B %-d").to_string();

    template
        .replace(CLIENT_NAME_TOKEN, &appointment.client_name)
        .replace(SERVICE_TOKEN, &appointment.service_name)
        .replace(TIME_TOKEN, &time)
        .replace(DATE_TOKEN, &date)
}
