use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::arr::{MediaKind, ServerKind};
use crate::search::SearchCategory;

/// Activity log event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Cycle lifecycle
    CycleStarted {
        cycle_id: Uuid,
        is_manual: bool,
        dry_run: bool,
    },
    CycleCompleted {
        cycle_id: Uuid,
        is_manual: bool,
        success: bool,
        searches_triggered: usize,
        failures: usize,
        duration_ms: u64,
    },

    // Detection
    ServerDetected {
        cycle_id: Uuid,
        server: String,
        server_kind: ServerKind,
        missing: usize,
        cutoff: usize,
    },
    ServerDetectionFailed {
        cycle_id: Uuid,
        server: String,
        server_kind: ServerKind,
        error: String,
    },

    // Searches
    /// One item about to be submitted in a search command.
    SearchItemTriggered {
        cycle_id: Uuid,
        server: String,
        category: SearchCategory,
        media_kind: MediaKind,
        item_id: i64,
        title: String,
        quality_profile: String,
    },
    SearchBatchTriggered {
        cycle_id: Uuid,
        server: String,
        category: SearchCategory,
        item_count: usize,
        dry_run: bool,
    },
    SearchBatchFailed {
        cycle_id: Uuid,
        server: String,
        category: SearchCategory,
        item_count: usize,
        error: String,
        rate_limited: bool,
    },
    /// Server dropped from the rest of the cycle after repeated rate limiting.
    ServerRateLimitSkipped {
        cycle_id: Uuid,
        server: String,
        skipped_items: usize,
    },
}

impl ActivityEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::CycleStarted { .. } => "cycle_started",
            Self::CycleCompleted { .. } => "cycle_completed",
            Self::ServerDetected { .. } => "server_detected",
            Self::ServerDetectionFailed { .. } => "server_detection_failed",
            Self::SearchItemTriggered { .. } => "search_item_triggered",
            Self::SearchBatchTriggered { .. } => "search_batch_triggered",
            Self::SearchBatchFailed { .. } => "search_batch_failed",
            Self::ServerRateLimitSkipped { .. } => "server_rate_limit_skipped",
        }
    }

    /// Cycle this event belongs to, if any.
    pub fn cycle_id(&self) -> Option<Uuid> {
        match self {
            Self::CycleStarted { cycle_id, .. }
            | Self::CycleCompleted { cycle_id, .. }
            | Self::ServerDetected { cycle_id, .. }
            | Self::ServerDetectionFailed { cycle_id, .. }
            | Self::SearchItemTriggered { cycle_id, .. }
            | Self::SearchBatchTriggered { cycle_id, .. }
            | Self::SearchBatchFailed { cycle_id, .. }
            | Self::ServerRateLimitSkipped { cycle_id, .. } => Some(*cycle_id),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }

    /// Library server this event concerns, if any.
    pub fn server(&self) -> Option<&str> {
        match self {
            Self::ServerDetected { server, .. }
            | Self::ServerDetectionFailed { server, .. }
            | Self::SearchItemTriggered { server, .. }
            | Self::SearchBatchTriggered { server, .. }
            | Self::SearchBatchFailed { server, .. }
            | Self::ServerRateLimitSkipped { server, .. } => Some(server),
            _ => None,
        }
    }
}

/// Stored activity record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub cycle_id: Option<String>,
    pub server: Option<String>,
    pub data: ActivityEvent,
}
