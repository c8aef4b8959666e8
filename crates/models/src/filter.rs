//! List filters for the appointment overview.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::appointment::Appointment;

/// Time window selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    All,
    /// Start still ahead.
    Upcoming,
    /// Already ended.
    Past,
}

/// Combined filter; every criterion must match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    #[serde(default)]
    pub time: TimeFilter,
    /// Calendar day of the start instant, in the caller's time zone.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Empty means every service.
    #[serde(default)]
    pub services: Vec<String>,
}

impl AppointmentFilter {
    pub fn on_day(date: NaiveDate) -> Self {
        Self { date: Some(date), ..Self::default() }
    }

    pub fn matches<Tz: TimeZone>(&self, apt: &Appointment, now: DateTime<Utc>, tz: &Tz) -> bool {
        let time_match = match self.time {
            TimeFilter::All => true,
            TimeFilter::Upcoming => apt.start > now,
            TimeFilter::Past => apt.end < now,
        };
        let date_match = self
            .date
            .map_or(true, |d| apt.start.with_timezone(tz).date_naive() == d);
        let service_match = self.services.is_empty() || self.services.iter().any(|s| *s == apt.service_id);
        time_match && date_match && service_match
    }

    /// Filter and order by start ascending.
    pub fn apply<Tz: TimeZone>(&self, mut items: Vec<Appointment>, now: DateTime<Utc>, tz: &Tz) -> Vec<Appointment> {
        items.retain(|a| self.matches(a, now, tz));
        items.sort_by_key(|a| a.start);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn apt(id: &str, start: DateTime<Utc>, minutes: i64, service: &str) -> Appointment {
        Appointment {
            id: id.into(),
            start,
            end: start + Duration::minutes(minutes),
            client_name: "Ana".into(),
            client_phone: "+49".into(),
            service_id: service.into(),
            service_name: "Haircut".into(),
            created_at: start - Duration::days(1),
        }
    }

    #[test]
    fn upcoming_and_past_use_start_and_end_respectively() {
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();
        let running = apt("running", now - Duration::minutes(30), 60, "1");
        let done = apt("done", now - Duration::hours(3), 60, "1");
        let later = apt("later", now + Duration::hours(2), 60, "1");
        let all = vec![later.clone(), running.clone(), done.clone()];

        let upcoming = AppointmentFilter { time: TimeFilter::Upcoming, ..Default::default() };
        let ids: Vec<_> = upcoming.apply(all.clone(), now, &Utc).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["later"]);

        let past = AppointmentFilter { time: TimeFilter::Past, ..Default::default() };
        let ids: Vec<_> = past.apply(all.clone(), now, &Utc).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["done"]);

        let ids: Vec<_> = AppointmentFilter::default().apply(all, now, &Utc).into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["done", "running", "later"]);
    }

    #[test]
    fn date_filter_uses_local_calendar_day() {
        // 23:30 UTC on the 14th is already the 15th at UTC+2.
        let start = Utc.with_ymd_and_hms(2024, 3, 14, 23, 30, 0).unwrap();
        let a = apt("a", start, 30, "1");
        let now = start;
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let the_15th = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert!(AppointmentFilter::on_day(the_15th).matches(&a, now, &tz));
        assert!(!AppointmentFilter::on_day(the_15th).matches(&a, now, &Utc));
    }

    #[test]
    fn service_filter_matches_any_selected_id() {
        let now = Utc::now();
        let a = apt("a", now, 30, "1");
        let b = apt("b", now, 30, "2");
        let f = AppointmentFilter { services: vec!["2".into(), "3".into()], ..Default::default() };
        assert!(!f.matches(&a, now, &Utc));
        assert!(f.matches(&b, now, &Utc));
    }
}
