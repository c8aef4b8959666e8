use std::fmt;

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const API_KEY_PLACEHOLDER: &str = "YOUR_API_KEY_HERE";
pub const DEVICE_PHONE_PLACEHOLDER: &str = "+1234567890";
pub const DEFAULT_SMS_ENDPOINT: &str = "https://api.httpsms.com/v1/messages/send";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: RuntimeConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Visual runtimes can show a local preview when SMS delivery is not configured.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Visual,
    #[default]
    Headless,
}

impl std::str::FromStr for RuntimeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "visual" => Ok(Self::Visual),
            "headless" => Ok(Self::Headless),
            other => Err(anyhow!("unknown runtime mode `{other}` (expected visual|headless)")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub runtime: RuntimeMode,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { runtime: RuntimeMode::default(), data_dir: default_data_dir() }
    }
}

#[derive(Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub device_phone_number: Option<String>,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self { endpoint: default_endpoint(), api_key: None, device_phone_number: None, retry: RetryConfig::default() }
    }
}

// api_key must never reach the logs
impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("device_phone_number", &self.device_phone_number)
            .field("retry", &self.retry)
            .finish()
    }
}

impl SmsConfig {
    /// Key present and not the placeholder sentinel.
    pub fn configured_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_PLACEHOLDER)
    }

    /// Sending number present and not the placeholder sentinel.
    pub fn configured_device_number(&self) -> Option<&str> {
        self.device_phone_number
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != DEVICE_PHONE_PLACEHOLDER)
    }
}

/// Delivery retry; disabled means exactly one attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_admin_addr")]
    pub addr: String,
}

impl Default for AdminConfig {
    fn default() -> Self { Self { enabled: false, addr: default_admin_addr() } }
}

fn default_data_dir() -> String { "data".to_string() }
fn default_endpoint() -> String { DEFAULT_SMS_ENDPOINT.to_string() }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base() -> u64 { 500 }
fn default_backoff_max() -> u64 { 10_000 }
fn default_admin_addr() -> String { "127.0.0.1:9188".to_string() }

/// Read `CONFIG_PATH` (or `config.toml`); a missing file yields defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    match std::fs::read_to_string(&path) {
        Ok(content) => parse(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(anyhow!("cannot read {path}: {e}")),
    }
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.apply_env(|key| std::env::var(key).ok())?;
        self.app.normalize();
        self.sms.validate()?;
        self.admin.validate()?;
        Ok(())
    }

    /// Environment wins over the file. `lookup` is injectable for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("HTTPSMS_API_KEY") {
            self.sms.api_key = Some(key);
        }
        if let Some(number) = lookup("DEVICE_PHONE_NUMBER") {
            self.sms.device_phone_number = Some(number);
        }
        if let Some(mode) = lookup("REMINDERS_RUNTIME") {
            self.app.runtime = mode.parse()?;
        }
        if let Some(dir) = lookup("REMINDERS_DATA_DIR") {
            self.app.data_dir = dir;
        }
        Ok(())
    }
}

impl RuntimeConfig {
    fn normalize(&mut self) {
        if self.data_dir.trim().is_empty() {
            self.data_dir = default_data_dir();
        }
    }
}

impl SmsConfig {
    pub fn validate(&self) -> Result<()> {
        let lower = self.endpoint.to_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(anyhow!("sms.endpoint must start with http:// or https://"));
        }
        if self.retry.enabled && self.retry.max_attempts == 0 {
            return Err(anyhow!("sms.retry.max_attempts must be >= 1"));
        }
        if self.retry.backoff_max_ms < self.retry.backoff_base_ms {
            return Err(anyhow!("sms.retry.backoff_max_ms must be >= backoff_base_ms"));
        }
        Ok(())
    }
}

impl AdminConfig {
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(anyhow!("admin.addr `{}` is not a socket address", self.addr));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.app.runtime, RuntimeMode::Headless);
        assert_eq!(cfg.app.data_dir, "data");
        assert_eq!(cfg.sms.endpoint, DEFAULT_SMS_ENDPOINT);
        assert!(!cfg.sms.retry.enabled);
        assert!(!cfg.admin.enabled);
    }

    #[test]
    fn parses_full_file() {
        let cfg = parse(
            r#"
            [app]
            runtime = "visual"
            data_dir = "/var/lib/reminders"

            [sms]
            api_key = "k-123"
            device_phone_number = "+4915100000000"

            [sms.retry]
            enabled = true
            max_attempts = 4

            [admin]
            enabled = true
            addr = "0.0.0.0:9300"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.app.runtime, RuntimeMode::Visual);
        assert_eq!(cfg.sms.configured_api_key(), Some("k-123"));
        assert_eq!(cfg.sms.retry.max_attempts, 4);
        assert_eq!(cfg.sms.retry.backoff_base_ms, 500);
        assert!(cfg.admin.validate().is_ok());
    }

    #[test]
    fn placeholders_count_as_unconfigured() {
        let sms = SmsConfig {
            api_key: Some(API_KEY_PLACEHOLDER.into()),
            device_phone_number: Some(DEVICE_PHONE_PLACEHOLDER.into()),
            ..SmsConfig::default()
        };
        assert_eq!(sms.configured_api_key(), None);
        assert_eq!(sms.configured_device_number(), None);
        assert_eq!(SmsConfig::default().configured_api_key(), None);
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = parse("[sms]\napi_key = \"from-file\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("HTTPSMS_API_KEY", "from-env"),
            ("DEVICE_PHONE_NUMBER", "+4915199999999"),
            ("REMINDERS_RUNTIME", "Visual"),
        ]
        .into_iter()
        .collect();
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.sms.configured_api_key(), Some("from-env"));
        assert_eq!(cfg.sms.configured_device_number(), Some("+4915199999999"));
        assert_eq!(cfg.app.runtime, RuntimeMode::Visual);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.sms.endpoint = "ftp://example.com".into();
        assert!(cfg.sms.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.admin = AdminConfig { enabled: true, addr: "nope".into() };
        assert!(cfg.admin.validate().is_err());

        let mut cfg = AppConfig::default();
        assert!(cfg.apply_env(|k| (k == "REMINDERS_RUNTIME").then(|| "kiosk".to_string())).is_err());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let sms = SmsConfig { api_key: Some("super-secret".into()), ..SmsConfig::default() };
        let dbg = format!("{sms:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
