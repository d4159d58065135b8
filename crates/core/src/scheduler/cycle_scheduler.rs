//! Timer-driven cycle scheduler with on-demand runs.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SettingsProvider;
use crate::context::CycleContext;
use crate::orchestrator::{CycleResult, CycleRunner, CycleSummary};

use super::{SchedulerError, SchedulerState, SchedulerStatus};

#[derive(Default)]
struct Inner {
    running: bool,
    started_once: bool,
    cycle_active: bool,
    next_run: Option<DateTime<Utc>>,
    last_run: Option<DateTime<Utc>>,
    last_cycle: Option<CycleSummary>,
    /// Stops the current timer loop; replaced on every start.
    stop: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn after(interval_secs: u64) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(interval_secs as i64)
}

/// Holds the single cycle slot. Dropping it frees the slot, even if the
/// owning future is dropped mid-cycle.
struct ActiveCycle {
    inner: Arc<Mutex<Inner>>,
}

impl ActiveCycle {
    fn claim(inner: &Arc<Mutex<Inner>>) -> Option<Self> {
        let mut state = lock(inner);
        if state.cycle_active {
            return None;
        }
        state.cycle_active = true;
        Some(Self {
            inner: Arc::clone(inner),
        })
    }

    fn finish(self, summary: CycleSummary) {
        let mut state = lock(&self.inner);
        state.last_run = Some(summary.finished_at);
        state.last_cycle = Some(summary);
    }
}

impl Drop for ActiveCycle {
    fn drop(&mut self) {
        lock(&self.inner).cycle_active = false;
    }
}

fn summarize(outcome: &Result<CycleResult, crate::orchestrator::CycleFailure>) -> CycleSummary {
    match outcome {
        Ok(result) => result.summary(),
        Err(failure) => failure.result.summary(),
    }
}

/// Runs cycles every `interval_secs` and on demand, never two at once.
///
/// Stopping is non-preemptive: a cycle already running finishes, and is not
/// followed by another. `shutdown` additionally cancels in-flight cycles
/// once the grace period runs out.
pub struct CycleScheduler {
    runner: Arc<dyn CycleRunner>,
    settings: Arc<dyn SettingsProvider>,
    inner: Arc<Mutex<Inner>>,
    shutdown: CancellationToken,
}

impl CycleScheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            runner,
            settings,
            inner: Arc::new(Mutex::new(Inner::default())),
            shutdown: CancellationToken::new(),
        }
    }

    fn interval_secs(&self) -> u64 {
        self.settings.automation().interval_secs.max(1)
    }

    /// Start the timer. The first cycle runs one interval from now.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let interval = self.interval_secs();
        let mut state = lock(&self.inner);
        if state.running {
            return Err(SchedulerError::AlreadyRunning);
        }

        let stop = CancellationToken::new();
        state.running = true;
        state.started_once = true;
        state.next_run = Some(after(interval));
        state.stop = Some(stop.clone());
        state.task = Some(tokio::spawn(Self::run_loop(
            Arc::clone(&self.runner),
            Arc::clone(&self.settings),
            Arc::clone(&self.inner),
            self.shutdown.clone(),
            stop,
            Duration::from_secs(interval),
        )));

        info!(interval_secs = interval, "Scheduler started");
        Ok(())
    }

    /// Cancel the pending timer. An in-flight cycle is left to finish.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let mut state = lock(&self.inner);
        if !state.running {
            return Err(SchedulerError::NotRunning);
        }

        state.running = false;
        state.next_run = None;
        if let Some(stop) = state.stop.take() {
            stop.cancel();
        }

        info!("Scheduler stopped");
        Ok(())
    }

    /// Run a cycle now and wait for it. Does not move the next scheduled run.
    pub async fn trigger_manual(&self) -> Result<CycleResult, SchedulerError> {
        let slot = ActiveCycle::claim(&self.inner).ok_or(SchedulerError::CycleActive)?;

        info!("Manual cycle requested");
        let ctx = CycleContext::with_cancel(true, self.shutdown.child_token());
        let outcome = self.runner.run_cycle(ctx).await;
        slot.finish(summarize(&outcome));

        outcome.map_err(SchedulerError::from)
    }

    pub fn status(&self) -> SchedulerStatus {
        let interval_secs = self.interval_secs();
        let state = lock(&self.inner);

        let current = if state.cycle_active {
            SchedulerState::CycleActive
        } else if state.running {
            SchedulerState::Waiting
        } else if state.started_once {
            SchedulerState::Stopped
        } else {
            SchedulerState::Idle
        };

        SchedulerStatus {
            state: current,
            running: state.running,
            cycle_active: state.cycle_active,
            interval_secs,
            next_run: state.next_run,
            last_run: state.last_run,
            last_cycle: state.last_cycle.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        lock(&self.inner).running
    }

    pub fn is_cycle_active(&self) -> bool {
        lock(&self.inner).cycle_active
    }

    /// Stop the timer and wait for the loop to exit. Cycles still running
    /// after `grace` are cancelled.
    pub async fn shutdown(&self, grace: Duration) {
        if let Err(SchedulerError::NotRunning) = self.stop() {
            debug!("Scheduler was not running at shutdown");
        }

        let task = lock(&self.inner).task.take();
        if let Some(mut task) = task {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                warn!("Cycle still running after grace period, cancelling it");
                self.shutdown.cancel();
                let _ = task.await;
            }
        }

        self.shutdown.cancel();
    }

    async fn run_loop(
        runner: Arc<dyn CycleRunner>,
        settings: Arc<dyn SettingsProvider>,
        inner: Arc<Mutex<Inner>>,
        shutdown: CancellationToken,
        stop: CancellationToken,
        first_wait: Duration,
    ) {
        debug!("Scheduler loop started");
        let mut wait = first_wait;

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            match ActiveCycle::claim(&inner) {
                Some(slot) => {
                    let ctx = CycleContext::with_cancel(false, shutdown.child_token());
                    let outcome = runner.run_cycle(ctx).await;
                    if let Err(ref failure) = outcome {
                        warn!(error = %failure, "Scheduled cycle recorded failures");
                    }
                    slot.finish(summarize(&outcome));
                }
                None => info!("Manual cycle in progress, skipping scheduled run"),
            }

            let interval = settings.automation().interval_secs.max(1);
            {
                let mut state = lock(&inner);
                if stop.is_cancelled() {
                    break;
                }
                state.next_run = Some(after(interval));
            }
            wait = Duration::from_secs(interval);
        }

        debug!("Scheduler loop exited");
    }
}
