//! The operations the booking UI performs, wired to the store, the reminder
//! scheduler and the SMS gateway.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use models::{AppSettings, Appointment, AppointmentFilter, NewAppointment, NewService, Service, SmsSettings};
use tracing::info;

use crate::delivery::{self, MessageSender};
use crate::errors::ServiceError;
use crate::scheduler::{ReminderScheduler, ScheduleOutcome};
use crate::storage::AppStore;

#[derive(Clone)]
pub struct AppointmentBook {
    store: Arc<AppStore>,
    scheduler: ReminderScheduler,
    sender: Arc<dyn MessageSender>,
}

impl AppointmentBook {
    pub fn new(store: Arc<AppStore>, scheduler: ReminderScheduler, sender: Arc<dyn MessageSender>) -> Self {
        Self { store, scheduler, sender }
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    /// Validate, save, then arm the reminder with the settings as they are now.
    pub async fn create_appointment(&self, input: NewAppointment) -> Result<(Appointment, ScheduleOutcome), ServiceError> {
        input.validate()?;
        let service_id = input.service_id.clone().unwrap_or_default();
        let service = self
            .store
            .service(service_id.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("service"))?;

        let appointment = input.into_appointment(&service, Utc::now())?;
        self.store.save_appointment(&appointment).await?;
        info!(
            event = "appointment_created",
            appointment_id = %appointment.id,
            client = %appointment.client_name,
            service = %appointment.service_name,
            start = %appointment.start,
            duration_min = appointment.duration_minutes(),
            "appointment booked"
        );

        let settings = self.store.settings().await?;
        let outcome = self.scheduler.schedule(&appointment, &settings.sms).await;
        Ok((appointment, outcome))
    }

    /// Sorted by start; date filters use the host's local calendar.
    pub async fn list_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, ServiceError> {
        self.list_appointments_in(filter, Utc::now(), &Local).await
    }

    pub async fn list_appointments_in<Tz: TimeZone>(
        &self,
        filter: &AppointmentFilter,
        now: DateTime<Utc>,
        tz: &Tz,
    ) -> Result<Vec<Appointment>, ServiceError> {
        Ok(filter.apply(self.store.appointments().await?, now, tz))
    }

    pub async fn todays_appointments(&self) -> Result<Vec<Appointment>, ServiceError> {
        self.list_appointments(&AppointmentFilter::on_day(Local::now().date_naive())).await
    }

    /// Removes the record and cancels its pending reminder, if any.
    pub async fn delete_appointment(&self, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_appointment(id).await? {
            return Err(ServiceError::not_found("appointment"));
        }
        let cancelled = self.scheduler.cancel(id).await;
        info!(event = "appointment_deleted", appointment_id = %id, reminder_cancelled = cancelled, "appointment deleted");
        Ok(())
    }

    pub async fn services(&self) -> Result<Vec<Service>, ServiceError> {
        self.store.services().await
    }

    pub async fn add_service(&self, input: NewService) -> Result<Service, ServiceError> {
        input.validate()?;
        let service = Service::new(input.name.trim(), input.duration, Utc::now());
        self.store.add_service(&service).await?;
        info!(event = "service_added", service_id = %service.id, name = %service.name, "service added");
        Ok(service)
    }

    pub async fn update_service(&self, id: &str, input: NewService) -> Result<Service, ServiceError> {
        input.validate()?;
        self.store.update_service(id, &input).await
    }

    /// Existing appointments keep their denormalized service name.
    pub async fn delete_service(&self, id: &str) -> Result<(), ServiceError> {
        if !self.store.delete_service(id).await? {
            return Err(ServiceError::not_found("service"));
        }
        info!(event = "service_deleted", service_id = %id, "service deleted");
        Ok(())
    }

    pub async fn settings(&self) -> Result<AppSettings, ServiceError> {
        self.store.settings().await
    }

    /// Applies to reminders scheduled from now on.
    pub async fn update_sms_settings(&self, sms: SmsSettings) -> Result<AppSettings, ServiceError> {
        let mut settings = self.store.settings().await?;
        settings.sms = sms;
        self.store.save_settings(&settings).await?;
        info!(event = "settings_updated", reminder_minutes = settings.sms.reminder_minutes, "sms settings saved");
        Ok(settings)
    }

    pub async fn send_test_sms(&self, phone_number: &str) -> Result<bool, ServiceError> {
        let phone = delivery::test_recipient(phone_number)?;
        Ok(self.sender.test_send(phone).await)
    }
}
