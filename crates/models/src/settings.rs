use serde::{Deserialize, Serialize};

pub const DEFAULT_TEMPLATE: &str =
    "Dear [Client Name], this is a reminder for your [Service] appointment at [Time]. See you soon!";
pub const DEFAULT_REMINDER_MINUTES: u32 = 60;

/// Reminder text template and lead time in minutes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsSettings {
    pub template: String,
    pub reminder_minutes: u32,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.to_string(), reminder_minutes: DEFAULT_REMINDER_MINUTES }
    }
}

/// The single settings document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    pub sms: SmsSettings,
}
