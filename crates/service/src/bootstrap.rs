//! Process wiring: store, gateway, scheduler, journal restore and the admin server.

use std::net::SocketAddr;
use std::sync::Arc;

use configs::AppConfig;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::booking::AppointmentBook;
use crate::delivery::{self, MessageSender, SmsGateway};
use crate::errors::ServiceError;
use crate::observability;
use crate::scheduler::{ReminderJournal, ReminderScheduler, RestoreSummary};
use crate::storage::AppStore;

pub struct App {
    pub book: AppointmentBook,
    pub store: Arc<AppStore>,
    pub gateway: Arc<SmsGateway>,
    pub restored: RestoreSummary,
    pub admin: Option<(SocketAddr, JoinHandle<()>)>,
}

impl App {
    pub fn scheduler(&self) -> &ReminderScheduler {
        self.book.scheduler()
    }
}

/// Build every component from `cfg` and re-arm reminders left in the journal.
pub async fn start(cfg: &AppConfig) -> anyhow::Result<App> {
    let store_path = common::env::ensure_data_dir(&cfg.app.data_dir).await?;
    let store = AppStore::open(store_path).await?;

    let gateway = Arc::new(SmsGateway::new(&cfg.sms, cfg.app.runtime));
    if !gateway.is_configured() {
        warn!(
            event = "sms_unconfigured",
            runtime = ?cfg.app.runtime,
            "SMS credentials missing; reminders will be previewed or fail"
        );
    }
    let sender: Arc<dyn MessageSender> = gateway.clone();

    let scheduler = ReminderScheduler::with_journal(sender.clone(), ReminderJournal::new(store.clone()));
    let restored = scheduler.restore(&store.appointments().await?).await;

    let admin = if cfg.admin.enabled {
        Some(common::admin_http::spawn_admin_server(&cfg.admin.addr, observability::encode_metrics).await?)
    } else {
        None
    };

    info!(
        event = "app_ready",
        data_dir = %cfg.app.data_dir,
        pending = scheduler.pending_count(),
        admin = admin.is_some(),
        "appointment reminders ready"
    );

    let book = AppointmentBook::new(store.clone(), scheduler, sender);
    Ok(App { book, store, gateway, restored, admin })
}

/// Send the canned test message with only the SMS settings from `cfg`.
/// Leaves the store, the reminder journal and the admin address alone, so it
/// can run next to a live host.
pub async fn send_test_sms(cfg: &AppConfig, phone_number: &str) -> Result<bool, ServiceError> {
    let phone = delivery::test_recipient(phone_number)?;
    let gateway = SmsGateway::new(&cfg.sms, cfg.app.runtime);
    info!(event = "test_sms", to = %phone, configured = gateway.is_configured(), "sending test sms");
    Ok(gateway.test_send(phone).await)
}
