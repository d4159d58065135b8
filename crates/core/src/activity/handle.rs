use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::ActivityEvent;

/// Sink for activity events.
///
/// Recording is fire and forget: implementations must never fail or block the
/// cycle for long.
#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, event: ActivityEvent);
}

/// Envelope wrapping an activity event with metadata
#[derive(Debug, Clone)]
pub struct ActivityEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: ActivityEvent,
}

/// Handle for emitting activity events
///
/// This is cheaply cloneable and can be shared across tasks.
/// Events are sent through an async channel to be written by the ActivityWriter.
#[derive(Clone)]
pub struct ActivityHandle {
    tx: mpsc::Sender<ActivityEnvelope>,
}

impl ActivityHandle {
    pub fn new(tx: mpsc::Sender<ActivityEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting for channel capacity.
    ///
    /// A closed channel is logged and otherwise ignored.
    pub async fn emit(&self, event: ActivityEvent) {
        let envelope = ActivityEnvelope {
            timestamp: Utc::now(),
            event,
        };
        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit activity event: {}", e);
        }
    }

    /// Try to emit an event without waiting
    ///
    /// Returns true if the event was sent successfully, false otherwise.
    pub fn try_emit(&self, event: ActivityEvent) -> bool {
        let envelope = ActivityEnvelope {
            timestamp: Utc::now(),
            event,
        };
        match self.tx.try_send(envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to emit activity event: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl ActivityLog for ActivityHandle {
    async fn record(&self, event: ActivityEvent) {
        self.emit(event).await;
    }
}

/// Activity log that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopActivityLog;

#[async_trait]
impl ActivityLog for NoopActivityLog {
    async fn record(&self, _event: ActivityEvent) {}
}
