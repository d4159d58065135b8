//! Scheduler types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::orchestrator::{CycleFailure, CycleSummary};

/// Errors returned by scheduler operations.
///
/// Misuse errors are returned before any state changes.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler not running")]
    NotRunning,

    #[error("cycle already active")]
    CycleActive,

    /// A manual cycle ran but recorded failures.
    #[error(transparent)]
    Cycle(#[from] CycleFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Never started.
    Idle,
    /// Started, waiting for the next run.
    Waiting,
    /// A cycle is running (scheduled or manual).
    CycleActive,
    /// Stopped after having been started.
    Stopped,
}

/// Snapshot of scheduler state.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub running: bool,
    pub cycle_active: bool,
    /// Interval currently configured.
    pub interval_secs: u64,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleSummary>,
}
