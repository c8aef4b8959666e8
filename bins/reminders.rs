use std::process::ExitCode;

use dotenvy::dotenv;
use tracing::{error, info, warn};
use uuid::Uuid;

fn init_logging() {
    // load .env before the filter reads RUST_LOG
    dotenv().ok();
    if std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false) {
        common::utils::logging::init_logging_json();
    } else {
        common::utils::logging::init_logging_default();
    }
    info!(service = "reminders", event = "logger_init", "tracing subscriber initialized");
}

enum Command {
    Run,
    TestSms(String),
}

fn parse_args() -> Result<Command, String> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        None => Ok(Command::Run),
        Some("test-sms") => args
            .next()
            .map(Command::TestSms)
            .ok_or_else(|| "usage: reminders test-sms <phone>".to_string()),
        Some(other) => Err(format!("unknown command `{other}`; usage: reminders [test-sms <phone>]")),
    }
}

fn main() -> ExitCode {
    init_logging();

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "reminders", event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let command = match parse_args() {
        Ok(c) => c,
        Err(usage) => {
            eprintln!("{usage}");
            return ExitCode::FAILURE;
        }
    };

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "reminders", event = "config_invalid", error = %e, "cannot load configuration");
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "reminders", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(service = "reminders", event = "start", %service_id, pid, version, runtime = ?cfg.app.runtime, "reminders starting");

    rt.block_on(async move {
        match command {
            // gateway only: no store, no restore, no admin listener
            Command::TestSms(phone) => match service::bootstrap::send_test_sms(&cfg, &phone).await {
                Ok(true) => {
                    info!(service = "reminders", event = "test_sms_sent", to = %phone, "test SMS sent successfully");
                    ExitCode::SUCCESS
                }
                Ok(false) => {
                    warn!(service = "reminders", event = "test_sms_failed", to = %phone, "failed to send test SMS; check the API key and device number");
                    ExitCode::FAILURE
                }
                Err(e) => {
                    error!(service = "reminders", event = "test_sms_rejected", error = %e, "test SMS not sent");
                    ExitCode::FAILURE
                }
            },
            Command::Run => {
                let app = match service::bootstrap::start(&cfg).await {
                    Ok(app) => app,
                    Err(e) => {
                        error!(service = "reminders", event = "bootstrap_failed", error = %e, "startup failed");
                        return ExitCode::FAILURE;
                    }
                };
                let mut events = app.scheduler().subscribe();
                loop {
                    tokio::select! {
                        ev = events.recv() => match ev {
                            Ok(ev) => info!(service = "reminders", event = "reminder_state", appointment_id = %ev.appointment_id, state = ?ev.state, "reminder state changed"),
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => warn!(skipped = n, "reminder event stream lagged"),
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break ExitCode::SUCCESS,
                        },
                        _ = tokio::signal::ctrl_c() => {
                            info!(
                                service = "reminders",
                                event = "shutdown_signal",
                                %service_id,
                                pid,
                                pending = app.scheduler().pending_count(),
                                "received Ctrl+C, shutting down; pending reminders stay in the journal"
                            );
                            break ExitCode::SUCCESS;
                        }
                    }
                }
            }
        }
    })
}
