use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use configs::{RuntimeMode, SmsConfig};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::delivery::retry::{retry_with_policy, RetryPolicy, Retryable};
use crate::delivery::{LogPreview, MessageSender, PreviewReason, PreviewSink, SmsPreview};
use crate::observability::{SMS_FAILED_TOTAL, SMS_PREVIEW_TOTAL, SMS_SENT_TOTAL};

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Failure of a single POST.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("sms api responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl Retryable for DeliveryError {
    fn is_retryable(&self) -> bool {
        match self {
            DeliveryError::Status { status, .. } => *status >= 500 || *status == 429,
            DeliveryError::Transport(_) => true,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
    encrypted: bool,
    from: &'a str,
    request_id: &'a str,
    to: &'a str,
}

/// `<unix millis>-<9 random base36 chars>`
pub fn new_request_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9).map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char).collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// httpSMS client.
///
/// Unconfigured credentials (absent or placeholder) never hit the network:
/// a visual runtime shows a preview and reports success, a headless one
/// reports failure.
pub struct SmsGateway {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    device_number: Option<String>,
    raw_device_number: Option<String>,
    mode: RuntimeMode,
    preview: Arc<dyn PreviewSink>,
    retry: RetryPolicy,
}

impl SmsGateway {
    pub fn new(cfg: &SmsConfig, mode: RuntimeMode) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.configured_api_key().map(str::to_string),
            device_number: cfg.configured_device_number().map(str::to_string),
            raw_device_number: cfg.device_phone_number.clone(),
            mode,
            preview: Arc::new(LogPreview),
            retry: RetryPolicy::from_config(&cfg.retry),
        }
    }

    pub fn with_preview(mut self, sink: Arc<dyn PreviewSink>) -> Self {
        self.preview = sink;
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.device_number.is_some()
    }

    fn preview_or_fail(&self, reason: PreviewReason, to: &str, message: &str) -> bool {
        match self.mode {
            RuntimeMode::Visual => {
                let from = match reason {
                    PreviewReason::ApiKeyRequired => self.raw_device_number.clone(),
                    PreviewReason::PhoneNumberRequired => None,
                };
                self.preview.show(&SmsPreview { reason, to: to.to_string(), from, message: message.to_string() });
                SMS_PREVIEW_TOTAL.inc();
                true
            }
            RuntimeMode::Headless => {
                SMS_FAILED_TOTAL.inc();
                false
            }
        }
    }

    async fn post(&self, api_key: &str, body: &SendMessageRequest<'_>) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-Key", api_key)
            .json(body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if status.is_success() {
            debug!(status = status.as_u16(), response = %text, "sms api accepted message");
            Ok(())
        } else {
            Err(DeliveryError::Status { status: status.as_u16(), body: text })
        }
    }
}

#[async_trait]
impl MessageSender for SmsGateway {
    async fn send(&self, phone_number: &str, message: &str) -> bool {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(event = "sms_unconfigured", "SMS API key not configured");
            return self.preview_or_fail(PreviewReason::ApiKeyRequired, phone_number, message);
        };
        let Some(from) = self.device_number.as_deref() else {
            warn!(event = "sms_unconfigured", "device phone number not configured");
            return self.preview_or_fail(PreviewReason::PhoneNumberRequired, phone_number, message);
        };

        let request_id = new_request_id();
        let body = SendMessageRequest { content: message, encrypted: false, from, request_id: &request_id, to: phone_number };
        let preview: String = message.chars().take(50).collect();
        info!(event = "sms_send", to = %phone_number, from = %from, %request_id, message = %preview, "sending sms");

        match retry_with_policy(&self.retry, || self.post(api_key, &body)).await {
            Ok(()) => {
                SMS_SENT_TOTAL.inc();
                info!(event = "sms_sent", %request_id, "sms sent");
                true
            }
            Err(e) => {
                SMS_FAILED_TOTAL.inc();
                error!(event = "sms_failed", %request_id, error = %e, "sms sending failed");
                false
            }
        }
    }
}
