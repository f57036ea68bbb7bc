//! # Reminder Scheduler
//!
//! Owns the active reminder set, computes due times, and drives firing
//! through the injected [`Clock`]. Each armed reminder is a spawned task
//! that sleeps until the due time and calls back into the scheduler; a
//! per-entry arm generation makes stale callbacks inert, so create, cancel,
//! update and fire can race freely without duplicate or lost firings.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Optional delivery budget so a stuck sink cannot starve rearm
//! - 1.1.0: Partial updates with busy detection during in-flight fires
//! - 1.0.0: Initial release with keyed active set and repeating reminders

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use tokio::task::AbortHandle;

use crate::clock::Clock;
use crate::core::config::DEFAULT_MESSAGE;
use crate::core::{format_interval, SchedulerError};
use crate::reminder::{
    normalize_message, validate_interval, Reminder, ReminderId, ReminderState, ReminderUpdate,
};
use crate::sink::NotificationSink;

/// Tracked reminder plus its arm bookkeeping
struct Entry {
    reminder: Reminder,

    /// Generation of the current pending arm. A fire callback whose
    /// generation no longer matches has been superseded and must not fire.
    arm: u64,

    /// Abort handle of the pending sleep task. Aborting is hygiene only;
    /// the generation check is what keeps a superseded arm from firing.
    task: Option<AbortHandle>,
}

/// Tuning knobs for a [`ReminderScheduler`]
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Substituted at delivery time for reminders without a message
    pub default_message: String,

    /// Cap on a single delivery. Past it the delivery counts as failed and
    /// a repeating reminder still rearms. `None` waits indefinitely.
    pub delivery_budget: Option<std::time::Duration>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        SchedulerOptions {
            default_message: DEFAULT_MESSAGE.to_string(),
            delivery_budget: None,
        }
    }
}

struct Inner {
    entries: DashMap<ReminderId, Entry>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn NotificationSink>,
    options: SchedulerOptions,
}

/// Drives timed, optionally repeating reminders against an injected
/// [`NotificationSink`]. Cheap to clone; all clones share one active set.
/// Safe for concurrent calls: mutations of a given reminder are serialized
/// through its map entry, and no scheduler lock is held during delivery.
#[derive(Clone)]
pub struct ReminderScheduler {
    inner: Arc<Inner>,
}

impl ReminderScheduler {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_options(clock, sink, SchedulerOptions::default())
    }

    pub fn with_options(
        clock: Arc<dyn Clock>,
        sink: Arc<dyn NotificationSink>,
        options: SchedulerOptions,
    ) -> Self {
        ReminderScheduler {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                clock,
                sink,
                options,
            }),
        }
    }

    /// Create a reminder and arm it `interval` from now.
    pub fn create(
        &self,
        message: Option<String>,
        interval: Duration,
        repeating: bool,
    ) -> Result<ReminderId, SchedulerError> {
        validate_interval(interval)?;

        let id = ReminderId::new();
        let now = self.inner.clock.now();
        let reminder = Reminder {
            id,
            message: normalize_message(message),
            interval,
            repeating,
            next_due_at: saturating_add(now, interval),
            state: ReminderState::Scheduled,
        };

        self.inner.entries.insert(
            id,
            Entry {
                reminder,
                arm: 1,
                task: None,
            },
        );
        self.install_arm(id, 1, interval);

        info!(
            "Created reminder {id}: every {}, repeating={repeating}",
            format_interval(interval.num_seconds())
        );
        Ok(id)
    }

    /// Cancel a reminder. Unknown and already-finished ids are a no-op, so
    /// racy UI-driven cancellations stay quiet.
    pub fn cancel(&self, id: ReminderId) {
        let removed = {
            let Some(mut entry) = self.inner.entries.get_mut(&id) else {
                debug!("Cancel of unknown reminder {id} ignored");
                return;
            };
            entry.arm += 1;
            if let Some(task) = entry.task.take() {
                task.abort();
            }
            match entry.reminder.state {
                ReminderState::Scheduled => {
                    entry.reminder.state = ReminderState::Cancelled;
                    true
                }
                // mid-fire: the fire path observes the cancellation after
                // delivery completes and drops the entry instead of rearming
                ReminderState::Firing => {
                    entry.reminder.state = ReminderState::Cancelled;
                    false
                }
                _ => false,
            }
        };

        if removed {
            self.inner.entries.remove(&id);
            info!("Cancelled reminder {id}");
        }
    }

    /// Cancel every active reminder.
    pub fn cancel_all(&self) {
        let ids: Vec<ReminderId> = self.inner.entries.iter().map(|e| *e.key()).collect();
        let count = ids.len();
        for id in ids {
            self.cancel(id);
        }
        if count > 0 {
            info!("Cancelled {count} active reminder(s)");
        }
    }

    /// Apply a partial update to a scheduled reminder, atomically replacing
    /// its pending arm: the old arm is invalidated before the new one is
    /// installed, and the reminder is rearmed from the current moment with
    /// the effective interval.
    pub fn update(&self, id: ReminderId, update: ReminderUpdate) -> Result<(), SchedulerError> {
        if let Some(interval) = update.interval {
            validate_interval(interval)?;
        }

        let (generation, interval) = {
            let mut entry = self
                .inner
                .entries
                .get_mut(&id)
                .ok_or(SchedulerError::UnknownReminder(id))?;
            match entry.reminder.state {
                ReminderState::Scheduled => {}
                ReminderState::Firing => return Err(SchedulerError::ReminderBusy(id)),
                // cancelled mid-fire, awaiting removal by the fire path
                _ => return Err(SchedulerError::UnknownReminder(id)),
            }

            entry.arm += 1;
            if let Some(task) = entry.task.take() {
                task.abort();
            }
            if let Some(message) = update.message {
                entry.reminder.message = normalize_message(Some(message));
            }
            if let Some(interval) = update.interval {
                entry.reminder.interval = interval;
            }
            if let Some(repeating) = update.repeating {
                entry.reminder.repeating = repeating;
            }

            let now = self.inner.clock.now();
            entry.reminder.next_due_at = saturating_add(now, entry.reminder.interval);
            (entry.arm, entry.reminder.interval)
        };

        self.install_arm(id, generation, interval);
        debug!(
            "Updated reminder {id}, rearmed for {}",
            format_interval(interval.num_seconds())
        );
        Ok(())
    }

    /// Deliver an immediate one-off notification, bypassing the active set
    /// entirely. Existing reminders and their timers are unaffected.
    pub async fn fire_now(&self, message: Option<String>) -> Result<(), SchedulerError> {
        let id = ReminderId::new();
        let fired_at = self.inner.clock.now();
        let message = normalize_message(message)
            .unwrap_or_else(|| self.inner.options.default_message.clone());

        debug!("Immediate notification {id}");
        self.deliver(id, &message, fired_at).await
    }

    /// Point-in-time snapshots of the active set. Mutating a returned
    /// [`Reminder`] has no effect on the scheduler.
    pub fn list_active(&self) -> Vec<Reminder> {
        self.inner
            .entries
            .iter()
            .filter(|e| !e.reminder.state.is_terminal())
            .map(|e| e.reminder.clone())
            .collect()
    }

    /// Snapshot a single reminder, if it is still active.
    pub fn get(&self, id: ReminderId) -> Option<Reminder> {
        self.inner.entries.get(&id).map(|e| e.reminder.clone())
    }

    /// Spawn the sleep task for arm `generation` and record its handle. If
    /// the entry was cancelled or superseded between spawn and record, the
    /// fresh task is aborted on the spot; its generation is stale anyway.
    fn install_arm(&self, id: ReminderId, generation: u64, delay: Duration) {
        let scheduler = self.clone();
        let sleep = delay.to_std().unwrap_or_default();
        let task = tokio::spawn(async move {
            scheduler.inner.clock.sleep(sleep).await;
            scheduler.fire(id, generation).await;
        });

        let handle = task.abort_handle();
        match self.inner.entries.get_mut(&id) {
            Some(mut entry)
                if entry.arm == generation
                    && entry.reminder.state == ReminderState::Scheduled =>
            {
                entry.task = Some(handle);
            }
            _ => handle.abort(),
        }
    }

    /// Fire callback for arm `generation` of reminder `id`.
    ///
    /// Fire-then-rearm: the rearm decision is made only after delivery has
    /// completed, so a cancellation issued during delivery prevents the next
    /// arm. Per reminder, fires are strictly ordered and non-overlapping.
    async fn fire(&self, id: ReminderId, generation: u64) {
        // claim: only the current arm of a scheduled reminder may fire
        let message = {
            let Some(mut entry) = self.inner.entries.get_mut(&id) else {
                return;
            };
            if entry.arm != generation || entry.reminder.state != ReminderState::Scheduled {
                debug!("Stale arm for reminder {id} ignored");
                return;
            }
            entry.reminder.state = ReminderState::Firing;
            entry.task = None;
            entry
                .reminder
                .effective_message(&self.inner.options.default_message)
                .to_string()
        };

        // no scheduler lock is held while the sink runs
        let fired_at = self.inner.clock.now();
        match self.deliver(id, &message, fired_at).await {
            Ok(()) => info!("Reminder {id} delivered at {fired_at}"),
            // a missed delivery must never silently stop future reminders
            Err(e) => warn!("Reminder {id}: {e}"),
        }

        // rearm decision: a cancel that landed during delivery wins here
        let next = {
            let Some(mut entry) = self.inner.entries.get_mut(&id) else {
                return;
            };
            match entry.reminder.state {
                ReminderState::Cancelled => None,
                _ if entry.reminder.repeating => {
                    entry.arm += 1;
                    entry.reminder.state = ReminderState::Scheduled;
                    entry.reminder.next_due_at =
                        saturating_add(fired_at, entry.reminder.interval);
                    Some((entry.arm, entry.reminder.next_due_at))
                }
                _ => {
                    entry.reminder.state = ReminderState::Completed;
                    None
                }
            }
        };

        match next {
            Some((generation, due)) => {
                // schedule relative to the fire time, not the current
                // moment, so slow deliveries do not accumulate drift
                let delay = due - self.inner.clock.now();
                self.install_arm(id, generation, delay);
            }
            None => {
                self.inner.entries.remove(&id);
                debug!("Reminder {id} left the active set");
            }
        }
    }

    async fn deliver(
        &self,
        id: ReminderId,
        message: &str,
        fired_at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        let attempt = self.inner.sink.deliver(id, message, fired_at);
        let outcome = match self.inner.options.delivery_budget {
            Some(budget) => {
                tokio::select! {
                    biased;
                    outcome = attempt => outcome,
                    _ = self.inner.clock.sleep(budget) => {
                        Err(anyhow::anyhow!("delivery exceeded budget of {budget:?}"))
                    }
                }
            }
            None => attempt.await,
        };
        outcome.map_err(|e| SchedulerError::DeliveryFailed(e.to_string()))
    }
}

fn saturating_add(instant: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    instant
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
