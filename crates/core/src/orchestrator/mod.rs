//! Automation cycles.
//!
//! A cycle reads the current settings, detects wanted items on every enabled
//! server, triggers searches within the configured limits, and reports the
//! outcome through tracing, the activity log and metrics.

mod config;
mod cycle;
mod types;

pub use config::AutomationConfig;
pub use cycle::{AutomationOrchestrator, CycleRunner};
pub use types::{CycleFailure, CycleResult, CycleSummary};
