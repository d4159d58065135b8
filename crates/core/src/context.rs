//! Per-cycle context passed through detection and search triggering.

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Errors returned by the engine phases themselves (as opposed to per-server
/// failures, which are recorded inside the results).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The cycle was cancelled before the phase started.
    #[error("cycle cancelled")]
    Cancelled,
}

/// Identity and cancellation for one automation cycle.
///
/// Cancelling the token aborts in-flight HTTP calls; they surface as
/// `ArrError::Cancelled` failures for the servers involved.
#[derive(Debug, Clone)]
pub struct CycleContext {
    pub cycle_id: Uuid,
    pub is_manual: bool,
    cancel: CancellationToken,
}

impl CycleContext {
    pub fn new(is_manual: bool) -> Self {
        Self::with_cancel(is_manual, CancellationToken::new())
    }

    pub fn with_cancel(is_manual: bool, cancel: CancellationToken) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            is_manual,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once the cycle is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}
