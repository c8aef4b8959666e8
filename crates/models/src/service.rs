use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

/// A bookable service. `duration` is in minutes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration: u32,
    pub created_at: DateTime<Utc>,
}

impl Service {
    pub fn new(name: &str, duration: u32, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4().to_string(), name: name.trim().to_string(), duration, created_at: now }
    }

    /// Catalog written on first read of an empty store.
    pub fn defaults(now: DateTime<Utc>) -> Vec<Service> {
        [("1", "Haircut", 60), ("2", "Hair Color", 120), ("3", "Massage Therapy", 90)]
            .into_iter()
            .map(|(id, name, duration)| Service { id: id.to_string(), name: name.to_string(), duration, created_at: now })
            .collect()
    }
}

/// Create/update input for a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewService {
    pub name: String,
    pub duration: u32,
}

impl NewService {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.trim().is_empty() {
            return Err(ModelError::invalid("please enter service name"));
        }
        if self.duration == 0 {
            return Err(ModelError::invalid("please enter valid duration"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_seed_catalog() {
        let now = Utc::now();
        let d = Service::defaults(now);
        let summary: Vec<(&str, &str, u32)> = d.iter().map(|s| (s.id.as_str(), s.name.as_str(), s.duration)).collect();
        assert_eq!(summary, vec![("1", "Haircut", 60), ("2", "Hair Color", 120), ("3", "Massage Therapy", 90)]);
        assert!(d.iter().all(|s| s.created_at == now));
    }

    #[test]
    fn new_service_validation() {
        assert!(NewService { name: "Beard Trim".into(), duration: 15 }.validate().is_ok());
        assert!(NewService { name: " ".into(), duration: 15 }.validate().is_err());
        assert!(NewService { name: "Beard Trim".into(), duration: 0 }.validate().is_err());
    }
}
