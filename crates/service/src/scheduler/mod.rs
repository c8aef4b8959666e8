//! One-shot reminder scheduling.
//!
//! A reminder fires `reminder_minutes` before the appointment starts. If that
//! instant has already passed when scheduling, the reminder is dropped; it is
//! never sent late. Each armed reminder is a Tokio task with its own
//! cancellation token, and is mirrored in the [`ReminderJournal`] when one is
//! attached so it can be re-armed after a restart.

pub mod journal;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use models::{Appointment, SmsSettings};
use tokio::sync::broadcast;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::delivery::MessageSender;
use crate::formatter;
use crate::observability::{
    REMINDERS_CANCELLED_TOTAL, REMINDERS_MISSED_TOTAL, REMINDERS_PENDING, REMINDERS_SCHEDULED_TOTAL,
};

pub use journal::{PendingReminder, ReminderJournal};

// Longest single timer wait; longer delays are slept in chunks.
const MAX_SLEEP_CHUNK: StdDuration = StdDuration::from_secs(24 * 60 * 60);
const EVENT_CAPACITY: usize = 256;

/// `start - lead_minutes`.
pub fn fire_instant(start: DateTime<Utc>, lead_minutes: u32) -> DateTime<Utc> {
    start - Duration::minutes(i64::from(lead_minutes))
}

/// Lifecycle of one reminder: `Pending -> Fired -> Delivered | Failed`,
/// or `Missed`/`Cancelled` without ever firing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReminderState {
    Pending { fire_at: DateTime<Utc> },
    Fired,
    Delivered,
    Failed,
    Missed { fire_at: DateTime<Utc> },
    Cancelled,
}

impl ReminderState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReminderState::Pending { .. } | ReminderState::Fired)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReminderEvent {
    pub appointment_id: String,
    pub state: ReminderState,
}

/// What `schedule` did. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Pending { fire_at: DateTime<Utc> },
    Missed { fire_at: DateTime<Utc> },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub rearmed: usize,
    pub missed: usize,
    pub orphaned: usize,
}

struct PendingHandle {
    token: CancellationToken,
    fire_at: DateTime<Utc>,
    generation: u64,
}

struct Inner {
    sender: Arc<dyn MessageSender>,
    journal: Option<ReminderJournal>,
    pending: Mutex<HashMap<String, PendingHandle>>,
    events: broadcast::Sender<ReminderEvent>,
    generation: AtomicU64,
    // held while an entry is armed and journaled, and while a journal entry is
    // dropped, so a late removal never erases a newer entry for the same id
    journal_gate: tokio::sync::Mutex<()>,
}

#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    pub fn new(sender: Arc<dyn MessageSender>) -> Self {
        Self::build(sender, None)
    }

    /// Persist armed reminders so `restore` can pick them up after a restart.
    pub fn with_journal(sender: Arc<dyn MessageSender>, journal: ReminderJournal) -> Self {
        Self::build(sender, Some(journal))
    }

    fn build(sender: Arc<dyn MessageSender>, journal: Option<ReminderJournal>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                sender,
                journal,
                pending: Mutex::new(HashMap::new()),
                events,
                generation: AtomicU64::new(0),
                journal_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Lifecycle events for every reminder handled from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ReminderEvent> {
        self.inner.events.subscribe()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock_pending().len()
    }

    pub fn pending_fire_time(&self, appointment_id: &str) -> Option<DateTime<Utc>> {
        self.inner.lock_pending().get(appointment_id).map(|h| h.fire_at)
    }

    /// Arm the reminder for `appointment` using `settings` as they are now.
    ///
    /// The template is captured here; later settings edits do not reach an
    /// armed reminder. Scheduling an appointment again replaces its pending
    /// reminder. Never fails: problems are logged and reported as events.
    pub async fn schedule(&self, appointment: &Appointment, settings: &SmsSettings) -> ScheduleOutcome {
        let fire_at = fire_instant(appointment.start, settings.reminder_minutes);
        self.arm(appointment.clone(), settings.template.clone(), fire_at, Utc::now()).await
    }

    /// Cancel a pending reminder. Returns `false` if none is pending (never
    /// scheduled, missed, already fired or cancelled).
    pub async fn cancel(&self, appointment_id: &str) -> bool {
        let Some(handle) = self.inner.lock_pending().remove(appointment_id) else {
            return false;
        };
        handle.token.cancel();
        REMINDERS_PENDING.dec();
        REMINDERS_CANCELLED_TOTAL.inc();
        info!(event = "reminder_cancelled", %appointment_id, "pending reminder cancelled");
        self.inner.forget(appointment_id).await;
        self.inner.emit(appointment_id, ReminderState::Cancelled);
        true
    }

    /// Re-arm journal entries against the current appointment list.
    /// Entries whose appointment is gone are dropped; lapsed ones follow the
    /// missed-reminder policy.
    pub async fn restore(&self, appointments: &[Appointment]) -> RestoreSummary {
        let mut summary = RestoreSummary::default();
        let Some(journal) = self.inner.journal.as_ref() else {
            return summary;
        };
        let entries = match journal.entries().await {
            Ok(e) => e,
            Err(e) => {
                error!(event = "journal_read_failed", error = %e, "cannot read reminder journal");
                return summary;
            }
        };

        let now = Utc::now();
        for entry in entries {
            match appointments.iter().find(|a| a.id == entry.appointment_id) {
                None => {
                    summary.orphaned += 1;
                    debug!(appointment_id = %entry.appointment_id, "dropping reminder for deleted appointment");
                    self.inner.forget(&entry.appointment_id).await;
                }
                Some(apt) => match self.arm(apt.clone(), entry.template, entry.fire_at, now).await {
                    ScheduleOutcome::Pending { .. } => summary.rearmed += 1,
                    ScheduleOutcome::Missed { .. } => summary.missed += 1,
                },
            }
        }
        info!(
            event = "reminders_restored",
            rearmed = summary.rearmed,
            missed = summary.missed,
            orphaned = summary.orphaned,
            "reminder journal restored"
        );
        summary
    }

    async fn arm(&self, appointment: Appointment, template: String, fire_at: DateTime<Utc>, now: DateTime<Utc>) -> ScheduleOutcome {
        let id = appointment.id.clone();
        let gate = self.inner.journal_gate.lock().await;
        let delay = match (fire_at - now).to_std() {
            Ok(d) if !d.is_zero() => d,
            _ => {
                if let Some(old) = self.inner.lock_pending().remove(&id) {
                    old.token.cancel();
                    REMINDERS_PENDING.dec();
                }
                self.inner.remove_journal_entry(&id).await;
                drop(gate);
                REMINDERS_MISSED_TOTAL.inc();
                info!(event = "reminder_missed", appointment_id = %id, client = %appointment.client_name, %fire_at, "reminder time has already passed");
                self.inner.emit(&id, ReminderState::Missed { fire_at });
                return ScheduleOutcome::Missed { fire_at };
            }
        };

        let token = CancellationToken::new();
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let replaced = self
            .inner
            .lock_pending()
            .insert(id.clone(), PendingHandle { token: token.clone(), fire_at, generation });
        match replaced {
            Some(old) => {
                old.token.cancel();
                debug!(appointment_id = %id, "replacing pending reminder");
            }
            None => REMINDERS_PENDING.inc(),
        }

        if let Some(journal) = &self.inner.journal {
            let entry = PendingReminder { appointment_id: id.clone(), fire_at, template: template.clone() };
            if let Err(e) = journal.upsert(&entry).await {
                warn!(event = "journal_write_failed", appointment_id = %id, error = %e, "reminder will not survive a restart");
            }
        }
        drop(gate);

        REMINDERS_SCHEDULED_TOTAL.inc();
        info!(
            event = "reminder_scheduled",
            appointment_id = %id,
            client = %appointment.client_name,
            %fire_at,
            in_minutes = delay.as_secs() / 60,
            "sms reminder scheduled"
        );
        self.inner.emit(&id, ReminderState::Pending { fire_at });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let deadline = Instant::now() + delay;
            tokio::select! {
                _ = token.cancelled() => {}
                _ = wait_until(deadline) => inner.fire(appointment, template, generation).await,
            }
        });

        ScheduleOutcome::Pending { fire_at }
    }
}

async fn wait_until(deadline: Instant) {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        sleep_until(deadline.min(now + MAX_SLEEP_CHUNK)).await;
    }
}

impl Inner {
    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, PendingHandle>> {
        // no code path panics while holding the lock; recover anyway
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn emit(&self, appointment_id: &str, state: ReminderState) {
        let _ = self.events.send(ReminderEvent { appointment_id: appointment_id.to_string(), state });
    }

    /// Drop the journal entry unless the id has been armed again meanwhile.
    async fn forget(&self, appointment_id: &str) {
        let _gate = self.journal_gate.lock().await;
        if self.lock_pending().contains_key(appointment_id) {
            debug!(%appointment_id, "reminder re-armed; keeping journal entry");
            return;
        }
        self.remove_journal_entry(appointment_id).await;
    }

    async fn remove_journal_entry(&self, appointment_id: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.remove(appointment_id).await {
                warn!(event = "journal_write_failed", %appointment_id, error = %e, "cannot remove journal entry");
            }
        }
    }

    async fn fire(&self, appointment: Appointment, template: String, generation: u64) {
        let id = appointment.id.clone();
        {
            let mut pending = self.lock_pending();
            match pending.get(&id) {
                Some(h) if h.generation == generation => {
                    pending.remove(&id);
                }
                // cancelled or replaced while the timer was elapsing
                _ => return,
            }
        }
        REMINDERS_PENDING.dec();
        self.emit(&id, ReminderState::Fired);
        self.forget(&id).await;

        info!(event = "reminder_fired", appointment_id = %id, to = %appointment.client_phone, "sending sms reminder");
        let message = formatter::render(&template, &appointment);
        if self.sender.send(&appointment.client_phone, &message).await {
            info!(event = "reminder_delivered", appointment_id = %id, client = %appointment.client_name, "sms reminder sent");
            self.emit(&id, ReminderState::Delivered);
        } else {
            warn!(event = "reminder_failed", appointment_id = %id, client = %appointment.client_name, "failed to send sms reminder");
            self.emit(&id, ReminderState::Failed);
        }
    }
}
