//! Expiration service and its scheduler loop
//!
//! The loop runs one sweep, logs any failure without propagating it, then
//! waits for the check interval. A stop request interrupts the wait at once;
//! a sweep already in progress always runs to completion, so a batch write is
//! never abandoned half way.

use chrono::{DateTime, Utc};
use coverwatch_config::ServiceConfig;
use coverwatch_store::{ExpirationLogEntry, Store};
use coverwatch_util::{format_duration, Result, SweepId};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, info_span};

use crate::{ExpirationLogWriter, ExpirationScanner};

/// Source of the current instant
pub type Clock = fn() -> DateTime<Utc>;

/// Outcome of a single sweep
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub sweep_id: SweepId,
    pub at: DateTime<Utc>,
    /// Policies confirmed expired within the window and not yet logged
    pub detected: usize,
    /// Entries actually written
    pub recorded: Vec<ExpirationLogEntry>,
}

/// Scanner and writer wired together with a clock and a cadence
pub struct ExpirationService {
    scanner: ExpirationScanner,
    writer: ExpirationLogWriter,
    interval: Duration,
    clock: Clock,
}

impl ExpirationService {
    pub fn new(store: Arc<dyn Store>, interval: Duration, window: Duration) -> Self {
        Self {
            scanner: ExpirationScanner::new(store.clone(), window),
            writer: ExpirationLogWriter::new(store),
            interval,
            clock: coverwatch_util::now,
        }
    }

    pub fn from_config(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self::new(store, config.check_interval, config.recency_window)
    }

    /// Replace the clock (tests, one-shot sweeps at a fixed instant)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one scan-and-record pass as of `now`
    pub fn run_once(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let sweep_id = SweepId::new();
        let span = info_span!("sweep", sweep_id = %sweep_id);
        let _enter = span.enter();

        let expired = self.scanner.scan(now)?;
        let recorded = self.writer.write(now, &expired)?;

        debug!(detected = expired.len(), recorded = recorded.len(), "Sweep finished");

        Ok(SweepReport {
            sweep_id,
            at: now,
            detected: expired.len(),
            recorded,
        })
    }

    /// One loop iteration behind a failure boundary. Errors and panics are
    /// logged and swallowed so the next iteration still runs.
    fn run_guarded(&self) {
        let now = (self.clock)();
        match panic::catch_unwind(AssertUnwindSafe(|| self.run_once(now))) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => {
                error!(error = %e, "Error occurred while checking expired policies");
            }
            Err(_) => {
                error!("Expiration sweep panicked");
            }
        }
    }
}

/// Lifecycle of the scheduler loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    StopRequested,
}

/// Drives an [`ExpirationService`] at its fixed interval until stopped
pub struct ExpirationScheduler {
    service: ExpirationService,
    state: watch::Sender<SchedulerState>,
}

impl ExpirationScheduler {
    pub fn new(service: ExpirationService) -> Self {
        let (state, _) = watch::channel(SchedulerState::Stopped);
        Self { service, state }
    }

    /// Spawn the loop on the current tokio runtime
    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state_rx = self.state.subscribe();
        let task = tokio::spawn(self.run(shutdown_rx));

        SchedulerHandle {
            shutdown: shutdown_tx,
            state: state_rx,
            task,
        }
    }

    /// Run the loop until `shutdown` becomes true or its sender is dropped
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        self.state.send_replace(SchedulerState::Running);
        info!(
            time = %(self.service.clock)(),
            interval = %format_duration(self.service.interval),
            window = %format_duration(self.service.scanner.window()),
            "Policy expiration service started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.service.run_guarded();

            tokio::select! {
                _ = tokio::time::sleep(self.service.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        self.state.send_replace(SchedulerState::StopRequested);
        info!(
            time = %(self.service.clock)(),
            "Policy expiration service is stopping"
        );
        self.state.send_replace(SchedulerState::Stopped);
    }
}

/// Handle to a spawned scheduler
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<SchedulerState>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Current lifecycle state
    pub fn state(&self) -> SchedulerState {
        let state = *self.state.borrow();
        if state == SchedulerState::Running && *self.shutdown.borrow() {
            SchedulerState::StopRequested
        } else {
            state
        }
    }

    /// Request a stop. The loop exits at its next check without waiting out
    /// the remaining delay.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for the loop to exit
    pub async fn join(self) -> std::result::Result<(), JoinError> {
        self.task.await
    }

    /// Request a stop and wait for the loop to exit
    pub async fn shutdown(self) -> std::result::Result<(), JoinError> {
        self.stop();
        self.join().await
    }
}
