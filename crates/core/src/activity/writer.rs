//! Persists activity events off the engine's hot path.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::{ActivityEnvelope, ActivityHandle, ActivityRecord, ActivityStore};

impl From<ActivityEnvelope> for ActivityRecord {
    fn from(envelope: ActivityEnvelope) -> Self {
        let ActivityEnvelope { timestamp, event } = envelope;
        Self {
            // Assigned on insert.
            id: 0,
            timestamp,
            event_type: event.event_type().to_string(),
            cycle_id: event.cycle_id().map(|id| id.to_string()),
            server: event.server().map(String::from),
            data: event,
        }
    }
}

/// Drains the activity channel into an `ActivityStore`.
///
/// The cycle and server columns are lifted out of the event so the store can
/// filter on them. A failed insert is logged and the event is dropped.
pub struct ActivityWriter {
    rx: mpsc::Receiver<ActivityEnvelope>,
    store: Arc<dyn ActivityStore>,
}

impl ActivityWriter {
    pub fn new(rx: mpsc::Receiver<ActivityEnvelope>, store: Arc<dyn ActivityStore>) -> Self {
        Self { rx, store }
    }

    /// Returns once the last `ActivityHandle` is gone and the channel is empty.
    pub async fn run(mut self) {
        info!("Activity writer started");
        let mut written = 0u64;
        let mut dropped = 0u64;

        while let Some(envelope) = self.rx.recv().await {
            let record = ActivityRecord::from(envelope);
            match self.store.insert(&record) {
                Ok(id) => {
                    written += 1;
                    debug!(id, event_type = %record.event_type, "Activity event stored");
                }
                Err(e) => {
                    dropped += 1;
                    error!(event_type = %record.event_type, error = %e, "Activity event lost");
                }
            }
        }

        info!(written, dropped, "Activity writer stopped");
    }
}

/// Wire a handle to a writer over a bounded channel of `buffer_size` events.
///
/// Spawn the writer with `tokio::spawn(writer.run())`.
pub fn create_activity_system(
    store: Arc<dyn ActivityStore>,
    buffer_size: usize,
) -> (ActivityHandle, ActivityWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (ActivityHandle::new(tx), ActivityWriter::new(rx, store))
}
