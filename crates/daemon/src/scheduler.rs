use std::sync::Arc;
use std::time::Duration;

use jobwatch_core::backoff::Backoff;
use jobwatch_core::error::FetchError;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::dispatcher::{CycleReport, Dispatcher};
use crate::teardown::Teardown;

/// Longest single wait between cycle starts, whatever the backoff says.
pub const MAX_DELAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Poll-loop lifecycle. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Polling,
    Backoff,
    Stopped,
}

/// Observable scheduler state, published after every transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    /// Completed cycles, successful or not.
    pub cycles: u64,
    pub consecutive_failures: u32,
    /// Gap between the last cycle start and the next one.
    pub next_delay: Duration,
    /// Ticks dropped because a cycle was still running.
    pub skipped_ticks: u64,
}

/// Requests a cooperative stop. Cloneable; cancelling twice is harmless.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Drives [`Dispatcher::run_cycle`] on a fixed-rate timer with failure backoff.
///
/// One cycle at most is ever in flight: the loop awaits each cycle before
/// computing the next start, and ticks missed meanwhile are skipped rather than
/// queued. Cancellation never interrupts a running cycle; the loop exits after
/// it completes.
pub struct Scheduler {
    dispatcher: Dispatcher,
    backoff: Backoff,
    status: watch::Sender<SchedulerStatus>,
    cancel: Arc<watch::Sender<bool>>,
}

impl Scheduler {
    pub fn new(dispatcher: Dispatcher, backoff: Backoff) -> Self {
        let (status, _) = watch::channel(SchedulerStatus {
            state: SchedulerState::Idle,
            cycles: 0,
            consecutive_failures: 0,
            next_delay: backoff.base,
            skipped_ticks: 0,
        });
        let (cancel, _) = watch::channel(false);
        Self {
            dispatcher,
            backoff,
            status,
            cancel: Arc::new(cancel),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: Arc::clone(&self.cancel),
        }
    }

    pub fn status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.subscribe()
    }

    /// Runs until cancelled. Returns the dispatcher and the final status.
    pub async fn run(mut self) -> (Dispatcher, SchedulerStatus) {
        let mut cancelled = self.cancel.subscribe();

        while !*cancelled.borrow_and_update() {
            let started = Instant::now();
            self.set_state(SchedulerState::Polling);

            let outcome = self.dispatcher.run_cycle().await;
            let failures = self.status.borrow().consecutive_failures;
            let (failures, state) = match outcome {
                Ok(_) => {
                    if failures > 0 {
                        info!(
                            after_failures = failures,
                            interval_secs = self.backoff.base.as_secs_f64(),
                            "fetch recovered; poll interval reset"
                        );
                    }
                    (0, SchedulerState::Idle)
                }
                Err(_) => (failures.saturating_add(1), SchedulerState::Backoff),
            };

            let delay = self.backoff.delay(failures).clamp(Duration::from_millis(1), MAX_DELAY);
            if state == SchedulerState::Backoff {
                warn!(
                    consecutive_failures = failures,
                    next_delay_secs = delay.as_secs_f64(),
                    "poll failed; backing off"
                );
            }

            let (next, skipped) = next_start(started, delay, Instant::now());
            if skipped > 0 {
                debug!(skipped, "cycle overran the interval; ticks skipped");
            }

            self.status.send_modify(|s| {
                s.state = state;
                s.cycles += 1;
                s.consecutive_failures = failures;
                s.next_delay = delay;
                s.skipped_ticks += skipped;
            });

            tokio::select! {
                _ = sleep_until(next) => {}
                _ = cancelled.changed() => {}
            }
        }

        self.set_state(SchedulerState::Stopped);
        info!("scheduler stopped");
        let status = self.status.borrow().clone();
        (self.dispatcher, status)
    }

    fn set_state(&self, state: SchedulerState) {
        self.status.send_modify(|s| s.state = state);
    }
}

/// One cycle for `--once`, then the teardown hooks, which run even when the fetch failed.
pub async fn run_once(dispatcher: &mut Dispatcher, teardown: Teardown) -> Result<CycleReport, FetchError> {
    let outcome = dispatcher.run_cycle().await;
    teardown.run();
    outcome
}

/// First tick at or after `started + delay` that is still in the future.
/// Never panics: an unrepresentable instant falls back to `now + MAX_DELAY`.
fn next_start(started: Instant, delay: Duration, now: Instant) -> (Instant, u64) {
    let Some(mut next) = started.checked_add(delay) else {
        return (now.checked_add(MAX_DELAY).unwrap_or(now), 0);
    };
    let mut skipped = 0;
    while next <= now {
        match next.checked_add(delay) {
            Some(n) => next = n,
            None => break,
        }
        skipped += 1;
    }
    (next, skipped)
}
