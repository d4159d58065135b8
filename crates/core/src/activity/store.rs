use chrono::{DateTime, Utc};
use thiserror::Error;

use super::ActivityRecord;

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Filter for querying activity records
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub cycle_id: Option<String>,
    pub event_type: Option<String>,
    pub server: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl ActivityFilter {
    pub fn new() -> Self {
        Self {
            limit: 100,
            offset: 0,
            ..Default::default()
        }
    }

    pub fn with_cycle_id(mut self, cycle_id: impl Into<String>) -> Self {
        self.cycle_id = Some(cycle_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Storage for activity records
pub trait ActivityStore: Send + Sync {
    /// Insert a record, returns the assigned ID
    fn insert(&self, record: &ActivityRecord) -> Result<i64, ActivityError>;

    /// Newest first
    fn query(&self, filter: &ActivityFilter) -> Result<Vec<ActivityRecord>, ActivityError>;

    fn count(&self, filter: &ActivityFilter) -> Result<i64, ActivityError>;
}
