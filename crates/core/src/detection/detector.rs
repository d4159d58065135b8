//! Concurrent missing/cutoff detection across all enabled servers.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::arr::{ArrError, ClientFactory, MediaItem};
use crate::config::{LibraryServer, SettingsProvider};
use crate::context::{CycleContext, EngineError};

use super::{DetectionResult, DetectionResults};

/// Detection phase of a cycle.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Query every enabled server. Per-server failures are recorded in the
    /// results; only a cancelled context fails the whole call.
    async fn detect_all(&self, ctx: &CycleContext) -> Result<DetectionResults, EngineError>;
}

/// Detector backed by `ArrClient`s built from the current settings.
pub struct ArrDetector {
    settings: Arc<dyn SettingsProvider>,
    factory: Arc<dyn ClientFactory>,
}

impl ArrDetector {
    pub fn new(settings: Arc<dyn SettingsProvider>, factory: Arc<dyn ClientFactory>) -> Self {
        Self { settings, factory }
    }

    /// Missing then cutoff for one server. Either failure fails the server.
    async fn detect_server(&self, server: LibraryServer, ctx: &CycleContext) -> DetectionResult {
        let client = match self.factory.client_for(&server) {
            Ok(client) => client,
            Err(e) => {
                return DetectionResult::failure(server, format!("client setup failed: {}", e))
            }
        };

        let missing = match cancellable(ctx, client.fetch_all_missing()).await {
            Ok(items) => items,
            Err(e) => {
                return DetectionResult::failure(server, format!("missing detection failed: {}", e))
            }
        };

        let cutoff = match cancellable(ctx, client.fetch_all_cutoff_unmet()).await {
            Ok(items) => items,
            Err(e) => {
                return DetectionResult::failure(server, format!("cutoff detection failed: {}", e))
            }
        };

        debug!(
            server = %server.name,
            missing = missing.len(),
            cutoff = cutoff.len(),
            "Server detection complete"
        );
        DetectionResult::success(server, missing, cutoff)
    }
}

/// Race a client call against cycle cancellation; dropping the call aborts it.
async fn cancellable<F>(ctx: &CycleContext, call: F) -> Result<Vec<MediaItem>, ArrError>
where
    F: std::future::Future<Output = Result<Vec<MediaItem>, ArrError>>,
{
    tokio::select! {
        result = call => result,
        _ = ctx.cancelled() => Err(ArrError::Cancelled),
    }
}

#[async_trait]
impl Detector for ArrDetector {
    async fn detect_all(&self, ctx: &CycleContext) -> Result<DetectionResults, EngineError> {
        if ctx.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let servers = self.settings.enabled_servers();
        if servers.is_empty() {
            info!("No enabled servers, skipping detection");
            return Ok(DetectionResults::default());
        }

        debug!(servers = servers.len(), "Starting parallel detection");

        let mut pending: FuturesUnordered<_> = servers
            .into_iter()
            .map(|server| self.detect_server(server, ctx))
            .collect();

        let mut aggregate = DetectionResults::default();
        while let Some(result) = pending.next().await {
            if let Some(ref error) = result.error {
                warn!(server = %result.server.name, error = %error, "Server detection failed");
            }
            aggregate.push(result);
        }

        Ok(aggregate)
    }
}
