//! Periodic cycle scheduling.
//!
//! The scheduler is an explicit instance owned by the entry point and shared
//! through `Arc`. It runs at most one cycle at a time, whether the cycle was
//! started by the timer or on demand.

mod cycle_scheduler;
mod types;

pub use cycle_scheduler::CycleScheduler;
pub use types::{SchedulerError, SchedulerState, SchedulerStatus};
