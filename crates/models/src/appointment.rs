use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::service::Service;

/// A booked appointment.
///
/// `service_name` is a snapshot of the service's display name taken at booking
/// time, so the record stays readable after the service is deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
    pub client_name: String,
    pub client_phone: String,
    pub service_id: String,
    pub service_name: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// Booking request as submitted by the UI; `id` and `created_at` are assigned on save.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    #[serde(rename = "startDate")]
    pub start: DateTime<Utc>,
    #[serde(rename = "endDate")]
    pub end: DateTime<Utc>,
    pub client_name: String,
    pub client_phone: String,
    #[serde(default)]
    pub service_id: Option<String>,
}

impl NewAppointment {
    /// Checks run in the same order the booking form reports them.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.client_name.trim().is_empty() {
            return Err(ModelError::invalid("please enter client name"));
        }
        if self.client_phone.trim().is_empty() {
            return Err(ModelError::invalid("please enter client phone number"));
        }
        if self.service_id.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(ModelError::invalid("please select a service"));
        }
        if self.end <= self.start {
            return Err(ModelError::invalid("end time must be after start time"));
        }
        Ok(())
    }

    /// Build the stored record against the resolved service.
    pub fn into_appointment(self, service: &Service, now: DateTime<Utc>) -> Result<Appointment, ModelError> {
        self.validate()?;
        Ok(Appointment {
            id: Uuid::new_v4().to_string(),
            start: self.start,
            end: self.end,
            client_name: self.client_name.trim().to_string(),
            client_phone: self.client_phone.trim().to_string(),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            created_at: now,
        })
    }
}
