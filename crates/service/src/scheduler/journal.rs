use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;
use crate::storage::app_store::{AppStore, REMINDERS_KEY};

/// A reminder waiting to fire, as persisted under the `reminders` key.
/// The template is the one captured when the reminder was scheduled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReminder {
    pub appointment_id: String,
    pub fire_at: DateTime<Utc>,
    pub template: String,
}

/// Durable record of armed reminders, so they can be re-armed after a restart.
#[derive(Clone)]
pub struct ReminderJournal {
    store: Arc<AppStore>,
}

impl ReminderJournal {
    pub fn new(store: Arc<AppStore>) -> Self {
        Self { store }
    }

    pub async fn entries(&self) -> Result<Vec<PendingReminder>, ServiceError> {
        Ok(self.store.load(REMINDERS_KEY).await?.unwrap_or_default())
    }

    /// Insert or replace the entry for `entry.appointment_id`.
    pub async fn upsert(&self, entry: &PendingReminder) -> Result<(), ServiceError> {
        self.store
            .modify_list(REMINDERS_KEY, |list: &mut Vec<PendingReminder>| {
                list.retain(|e| e.appointment_id != entry.appointment_id);
                list.push(entry.clone());
                Ok(())
            })
            .await
    }

    pub async fn remove(&self, appointment_id: &str) -> Result<bool, ServiceError> {
        self.store
            .modify_list(REMINDERS_KEY, |list: &mut Vec<PendingReminder>| {
                let before = list.len();
                list.retain(|e| e.appointment_id != appointment_id);
                Ok(list.len() != before)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn upsert_replaces_by_appointment_id() -> anyhow::Result<()> {
        let tmp = std::env::temp_dir().join(format!("journal_{}.json", uuid::Uuid::new_v4()));
        let journal = ReminderJournal::new(AppStore::open(&tmp).await?);
        let at = Utc::now() + Duration::hours(2);

        journal.upsert(&PendingReminder { appointment_id: "a".into(), fire_at: at, template: "one".into() }).await?;
        journal.upsert(&PendingReminder { appointment_id: "b".into(), fire_at: at, template: "two".into() }).await?;
        journal.upsert(&PendingReminder { appointment_id: "a".into(), fire_at: at, template: "three".into() }).await?;

        let entries = journal.entries().await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries.iter().find(|e| e.appointment_id == "a").map(|e| e.template.as_str()), Some("three"));

        assert!(journal.remove("b").await?);
        assert!(!journal.remove("b").await?);
        assert_eq!(journal.entries().await?.len(), 1);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
