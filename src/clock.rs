//! # Clock Abstraction
//!
//! Wall-clock time and delayed wakeups behind a trait, so the scheduler can
//! run against real time in production and simulated time in tests without
//! any real waiting.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: ManualClock wakes sleepers strictly in deadline order
//! - 1.0.0: Initial release with SystemClock

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

/// Source of wall-clock time and delayed wakeups.
///
/// `sleep` completes no earlier than `duration` after the call. Cancellation
/// of a pending delay is expressed by dropping the future (or aborting the
/// task that awaits it); callers that need a hard guarantee must pair the
/// abort with their own bookkeeping, since an abort that lands after the
/// sleep resolved is a no-op.
#[async_trait]
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend the calling task for at least `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the system time and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

struct Sleeper {
    deadline: DateTime<Utc>,
    wake: oneshot::Sender<()>,
}

struct ManualState {
    now: DateTime<Utc>,
    sleepers: Vec<Sleeper>,
}

/// Deterministic clock for tests and simulations.
///
/// Time only moves when [`advance`](ManualClock::advance) is called. Pending
/// sleepers are woken strictly in deadline order, and the runtime gets a
/// chance to run woken tasks (and anything they schedule) before time moves
/// past them, so a fire-then-rearm chain lands its next sleep in the same
/// advance.
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            state: Mutex::new(ManualState {
                now: start,
                sleepers: Vec::new(),
            }),
        }
    }

    /// Create a clock frozen at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move simulated time forward by `step`.
    pub async fn advance(&self, step: chrono::Duration) {
        // let tasks spawned just before this call register their sleeps
        for _ in 0..32 {
            tokio::task::yield_now().await;
        }

        let target = {
            let state = self.state.lock().unwrap();
            saturating_add(state.now, step)
        };

        loop {
            let wake = {
                let mut state = self.state.lock().unwrap();
                // sleepers whose waiter went away (e.g. a lost select arm)
                state.sleepers.retain(|s| !s.wake.is_closed());

                let next = state
                    .sleepers
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.deadline <= target)
                    .min_by_key(|(_, s)| s.deadline)
                    .map(|(i, _)| i);

                match next {
                    Some(i) => {
                        let sleeper = state.sleepers.swap_remove(i);
                        state.now = state.now.max(sleeper.deadline);
                        Some(sleeper.wake)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match wake {
                Some(tx) => {
                    let _ = tx.send(());
                    // let the woken task run to its next suspension point
                    // before time moves on
                    for _ in 0..32 {
                        tokio::task::yield_now().await;
                    }
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.state.lock().unwrap().now
    }

    async fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }

        let rx = {
            let mut state = self.state.lock().unwrap();
            let delta = chrono::Duration::from_std(duration)
                .unwrap_or_else(|_| chrono::Duration::max_value());
            let deadline = saturating_add(state.now, delta);
            let (tx, rx) = oneshot::channel();
            state.sleepers.push(Sleeper { deadline, wake: tx });
            rx
        };

        // a dropped sender (clock torn down) counts as a wakeup
        let _ = rx.await;
    }
}

fn saturating_add(instant: DateTime<Utc>, delta: chrono::Duration) -> DateTime<Utc> {
    instant
        .checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
