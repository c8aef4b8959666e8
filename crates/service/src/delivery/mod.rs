//! Outbound SMS delivery.
//!
//! `MessageSender` is the seam the scheduler talks to; `SmsGateway` is the
//! HTTP implementation. Delivery never returns an error to the caller: every
//! outcome collapses to `true`/`false`.

pub mod gateway;
pub mod retry;

use async_trait::async_trait;
use tracing::info;

use crate::errors::ServiceError;

pub use gateway::SmsGateway;
pub use retry::RetryPolicy;

pub const TEST_MESSAGE: &str =
    "Test message from your appointment scheduler app. If you receive this, SMS is working correctly!";

#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> bool;

    /// Send the canned test message through the regular path.
    async fn test_send(&self, phone_number: &str) -> bool {
        self.send(phone_number, TEST_MESSAGE).await
    }
}

/// Trimmed recipient for a test message; blank input is rejected.
pub fn test_recipient(phone_number: &str) -> Result<&str, ServiceError> {
    let phone = phone_number.trim();
    if phone.is_empty() {
        return Err(ServiceError::Validation("please enter a phone number to test".into()));
    }
    Ok(phone)
}

/// Why delivery fell back to a preview.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreviewReason {
    ApiKeyRequired,
    PhoneNumberRequired,
}

impl PreviewReason {
    pub fn title(self) -> &'static str {
        match self {
            PreviewReason::ApiKeyRequired => "SMS Preview (API Key Required)",
            PreviewReason::PhoneNumberRequired => "SMS Preview (Phone Number Required)",
        }
    }
}

/// The message that would have been sent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmsPreview {
    pub reason: PreviewReason,
    pub to: String,
    pub from: Option<String>,
    pub message: String,
}

impl std::fmt::Display for SmsPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.reason.title())?;
        writeln!(f)?;
        writeln!(f, "To: {}", self.to)?;
        if let Some(from) = &self.from {
            writeln!(f, "From: {from}")?;
        }
        write!(f, "Message: {}", self.message)
    }
}

/// Where previews are surfaced on a visual runtime.
pub trait PreviewSink: Send + Sync {
    fn show(&self, preview: &SmsPreview);
}

/// Writes previews to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogPreview;

impl PreviewSink for LogPreview {
    fn show(&self, preview: &SmsPreview) {
        info!(event = "sms_preview", to = %preview.to, reason = ?preview.reason, "\n{preview}");
    }
}
