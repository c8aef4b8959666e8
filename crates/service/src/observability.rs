use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder};

// Prometheus metrics (default registry)
pub static REMINDERS_SCHEDULED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("reminders_scheduled_total", "Reminders armed for a future fire time")
        .expect("register reminders_scheduled_total")
});

pub static REMINDERS_MISSED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("reminders_missed_total", "Reminders dropped because the fire time had passed")
        .expect("register reminders_missed_total")
});

pub static REMINDERS_CANCELLED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("reminders_cancelled_total", "Pending reminders cancelled before firing")
        .expect("register reminders_cancelled_total")
});

pub static REMINDERS_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("reminders_pending", "Reminders currently waiting to fire")
        .expect("register reminders_pending")
});

pub static SMS_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("sms_sent_total", "Messages accepted by the SMS API")
        .expect("register sms_sent_total")
});

pub static SMS_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("sms_failed_total", "Messages rejected or lost in transport")
        .expect("register sms_failed_total")
});

pub static SMS_PREVIEW_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("sms_preview_total", "Messages shown as local preview because delivery is unconfigured")
        .expect("register sms_preview_total")
});

pub static SMS_RETRIES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("sms_retries_total", "Delivery retry attempts")
        .expect("register sms_retries_total")
});

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
