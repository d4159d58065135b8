//! Activity log that keeps events in memory.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::activity::{ActivityEvent, ActivityLog};

/// Records every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingActivityLog {
    events: Mutex<Vec<ActivityEvent>>,
}

impl RecordingActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in emission order.
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events with the given `event_type()`.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.event_type() == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl ActivityLog for RecordingActivityLog {
    async fn record(&self, event: ActivityEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
