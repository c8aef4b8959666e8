use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use models::{AppSettings, Appointment, NewService, Service};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;

pub const APPOINTMENTS_KEY: &str = "appointments";
pub const SERVICES_KEY: &str = "services";
pub const SETTINGS_KEY: &str = "settings";
pub const REMINDERS_KEY: &str = "reminders";

/// Typed document repository over a [`JsonMapStore`].
///
/// Each key holds one JSON document: the appointment list, the service list,
/// the settings object and the reminder journal.
pub struct AppStore {
    docs: Arc<JsonMapStore<String, Value>>,
}

impl AppStore {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let docs = JsonMapStore::<String, Value>::new(path).await?;
        Ok(Arc::new(Self { docs }))
    }

    /// Read and decode a document; `None` when the key is absent.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        match self.docs.get(&key.to_string()).await {
            Some(v) => serde_json::from_value(v)
                .map(Some)
                .map_err(|e| ServiceError::Storage(format!("document `{key}` unreadable: {e}"))),
            None => Ok(None),
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, doc: &T) -> Result<(), ServiceError> {
        let v = serde_json::to_value(doc).map_err(ServiceError::storage)?;
        self.docs.insert(key.to_string(), v).await
    }

    /// Read-modify-write of one list document under the store lock.
    pub(crate) async fn modify_list<T, R, F>(&self, key: &str, f: F) -> Result<R, ServiceError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Result<R, ServiceError>,
    {
        let mut out = None;
        self.docs
            .update_map(|m| {
                let mut items: Vec<T> = match m.get(key) {
                    Some(v) => serde_json::from_value(v.clone())
                        .map_err(|e| ServiceError::Storage(format!("document `{key}` unreadable: {e}")))?,
                    None => Vec::new(),
                };
                out = Some(f(&mut items)?);
                m.insert(key.to_string(), serde_json::to_value(&items).map_err(ServiceError::storage)?);
                Ok(())
            })
            .await?;
        out.ok_or_else(|| ServiceError::Storage(format!("update of `{key}` produced no result")))
    }

    // appointments

    pub async fn appointments(&self) -> Result<Vec<Appointment>, ServiceError> {
        Ok(self.load(APPOINTMENTS_KEY).await?.unwrap_or_default())
    }

    pub async fn appointment(&self, id: &str) -> Result<Option<Appointment>, ServiceError> {
        Ok(self.appointments().await?.into_iter().find(|a| a.id == id))
    }

    pub async fn save_appointment(&self, appointment: &Appointment) -> Result<(), ServiceError> {
        self.modify_list(APPOINTMENTS_KEY, |list: &mut Vec<Appointment>| {
            list.push(appointment.clone());
            Ok(())
        })
        .await?;
        debug!(appointment_id = %appointment.id, "appointment saved");
        Ok(())
    }

    /// Returns whether a record was removed.
    pub async fn delete_appointment(&self, id: &str) -> Result<bool, ServiceError> {
        self.modify_list(APPOINTMENTS_KEY, |list: &mut Vec<Appointment>| {
            let before = list.len();
            list.retain(|a| a.id != id);
            Ok(list.len() != before)
        })
        .await
    }

    // services

    /// Seeds the default catalog when the document is absent.
    pub async fn services(&self) -> Result<Vec<Service>, ServiceError> {
        if let Some(list) = self.load(SERVICES_KEY).await? {
            return Ok(list);
        }
        let defaults = Service::defaults(Utc::now());
        self.save_services(&defaults).await?;
        info!(count = defaults.len(), "seeded default services");
        Ok(defaults)
    }

    pub async fn service(&self, id: &str) -> Result<Option<Service>, ServiceError> {
        Ok(self.services().await?.into_iter().find(|s| s.id == id))
    }

    pub async fn save_services(&self, services: &[Service]) -> Result<(), ServiceError> {
        self.put(SERVICES_KEY, &services).await
    }

    pub async fn add_service(&self, service: &Service) -> Result<(), ServiceError> {
        self.services().await?;
        self.modify_list(SERVICES_KEY, |list: &mut Vec<Service>| {
            list.push(service.clone());
            Ok(())
        })
        .await
    }

    pub async fn update_service(&self, id: &str, input: &NewService) -> Result<Service, ServiceError> {
        self.services().await?;
        self.modify_list(SERVICES_KEY, |list: &mut Vec<Service>| {
            let existing = list.iter_mut().find(|s| s.id == id).ok_or_else(|| ServiceError::not_found("service"))?;
            existing.name = input.name.trim().to_string();
            existing.duration = input.duration;
            Ok(existing.clone())
        })
        .await
    }

    /// Appointments referencing the service are left as they are.
    pub async fn delete_service(&self, id: &str) -> Result<bool, ServiceError> {
        self.services().await?;
        self.modify_list(SERVICES_KEY, |list: &mut Vec<Service>| {
            let before = list.len();
            list.retain(|s| s.id != id);
            Ok(list.len() != before)
        })
        .await
    }

    // settings

    /// Seeds the default settings when the document is absent.
    pub async fn settings(&self) -> Result<AppSettings, ServiceError> {
        if let Some(s) = self.load(SETTINGS_KEY).await? {
            return Ok(s);
        }
        let defaults = AppSettings::default();
        self.save_settings(&defaults).await?;
        info!("seeded default settings");
        Ok(defaults)
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<(), ServiceError> {
        self.put(SETTINGS_KEY, settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    async fn open_tmp() -> anyhow::Result<(Arc<AppStore>, PathBuf)> {
        let tmp = std::env::temp_dir().join(format!("app_store_{}.json", uuid::Uuid::new_v4()));
        Ok((AppStore::open(&tmp).await?, tmp))
    }

    fn appointment(id: &str, service: &Service) -> Appointment {
        // sub-millisecond component on purpose
        let start = Utc.with_ymd_and_hms(2024, 3, 14, 15, 30, 0).unwrap() + Duration::microseconds(123_456);
        Appointment {
            id: id.into(),
            start,
            end: start + Duration::minutes(service.duration as i64),
            client_name: "Ana".into(),
            client_phone: "+4915112345678".into(),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn appointment_dates_survive_reload() -> anyhow::Result<()> {
        let (store, tmp) = open_tmp().await?;
        let svc = store.services().await?.remove(0);
        let apt = appointment("a1", &svc);
        store.save_appointment(&apt).await?;

        let reopened = AppStore::open(&tmp).await?;
        let all = reopened.appointments().await?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].start, apt.start);
        assert_eq!(all[0].end, apt.end);
        assert_eq!(all[0].created_at, apt.created_at);
        assert_eq!(all[0].start.timestamp_millis(), apt.start.timestamp_millis());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn appointments_keep_insertion_order_and_delete_by_id() -> anyhow::Result<()> {
        let (store, tmp) = open_tmp().await?;
        let svc = store.services().await?.remove(0);
        for id in ["a", "b", "c"] {
            store.save_appointment(&appointment(id, &svc)).await?;
        }
        assert!(store.delete_appointment("b").await?);
        assert!(!store.delete_appointment("b").await?);
        let ids: Vec<String> = store.appointments().await?.into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert!(store.appointment("c").await?.is_some());

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn first_read_seeds_services_and_settings() -> anyhow::Result<()> {
        let (store, tmp) = open_tmp().await?;
        assert!(store.load::<Vec<Service>>(SERVICES_KEY).await?.is_none());

        let names: Vec<String> = store.services().await?.into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Haircut", "Hair Color", "Massage Therapy"]);
        assert!(store.load::<Vec<Service>>(SERVICES_KEY).await?.is_some());

        let settings = store.settings().await?;
        assert_eq!(settings.sms.reminder_minutes, 60);
        assert!(settings.sms.template.contains("[Client Name]"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_service_leaves_appointments_alone() -> anyhow::Result<()> {
        let (store, tmp) = open_tmp().await?;
        let svc = store.services().await?.remove(1);
        let apt = appointment("a1", &svc);
        store.save_appointment(&apt).await?;

        assert!(store.delete_service(&svc.id).await?);
        assert!(store.service(&svc.id).await?.is_none());

        let kept = store.appointment("a1").await?.expect("appointment kept");
        assert_eq!(kept, apt);
        assert_eq!(kept.service_name, "Hair Color");

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn update_service_renames_in_place() -> anyhow::Result<()> {
        let (store, tmp) = open_tmp().await?;
        let updated = store.update_service("1", &NewService { name: " Men's Cut ".into(), duration: 45 }).await?;
        assert_eq!(updated.name, "Men's Cut");
        assert_eq!(store.service("1").await?.map(|s| s.duration), Some(45));

        let missing = store.update_service("nope", &NewService { name: "x".into(), duration: 1 }).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
