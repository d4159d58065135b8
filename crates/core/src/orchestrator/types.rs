//! Types for automation cycles.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::detection::DetectionResults;
use crate::search::TriggerResults;

/// Everything a cycle did, returned whether or not it recorded failures.
#[derive(Debug, Clone, Serialize)]
pub struct CycleResult {
    pub cycle_id: Uuid,
    pub is_manual: bool,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub detection: DetectionResults,
    pub triggers: TriggerResults,
    /// No failure of any kind was recorded.
    pub success: bool,
    pub total_searches_triggered: usize,
    /// Failed servers plus failed search commands.
    pub total_failures: usize,
    /// One message per recorded failure.
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl CycleResult {
    /// Short form kept by the scheduler for status reporting.
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            cycle_id: self.cycle_id,
            is_manual: self.is_manual,
            success: self.success,
            finished_at: self.finished_at,
            total_searches_triggered: self.total_searches_triggered,
            total_failures: self.total_failures,
        }
    }
}

/// Outcome of a finished cycle, without the per-server detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub is_manual: bool,
    pub success: bool,
    pub finished_at: DateTime<Utc>,
    pub total_searches_triggered: usize,
    pub total_failures: usize,
}

/// A cycle that recorded at least one failure. Carries the full result.
#[derive(Debug, Error)]
#[error("cycle finished with {} error(s): {}", .result.errors.len(), .result.errors.join("; "))]
pub struct CycleFailure {
    pub result: Box<CycleResult>,
}

impl CycleFailure {
    pub fn new(result: CycleResult) -> Self {
        Self {
            result: Box::new(result),
        }
    }

    pub fn into_result(self) -> CycleResult {
        *self.result
    }
}
