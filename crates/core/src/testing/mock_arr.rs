//! Mock library server client for testing.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::arr::{ArrClient, ArrError, ClientFactory, MediaItem, SystemStatus};
use crate::config::LibraryServer;

#[derive(Debug, Default)]
struct MockState {
    missing: Vec<MediaItem>,
    cutoff: Vec<MediaItem>,
    missing_error: Option<ArrError>,
    cutoff_error: Option<ArrError>,
    connection_error: Option<ArrError>,
    /// Outcomes for upcoming trigger calls; an empty queue means success.
    trigger_script: VecDeque<Result<(), ArrError>>,
    trigger_calls: Vec<Vec<i64>>,
    missing_fetches: usize,
    cutoff_fetches: usize,
    delay: Duration,
}

/// Mock implementation of the `ArrClient` trait.
///
/// Clones share state, so a test can keep one handle for assertions and
/// hand another to a `MockClientFactory`.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockArrClient::with_items(fixtures::movies(1, 3), vec![]);
/// client.push_trigger_error(ArrError::RateLimited { retry_after: None });
///
/// client.trigger_search(&[1]).await.unwrap_err();
/// client.trigger_search(&[2]).await.unwrap();
/// assert_eq!(client.trigger_calls(), vec![vec![1], vec![2]]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockArrClient {
    state: Arc<Mutex<MockState>>,
}

impl MockArrClient {
    /// Client reporting nothing and accepting every search.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(missing: Vec<MediaItem>, cutoff: Vec<MediaItem>) -> Self {
        let client = Self::new();
        client.set_items(missing, cutoff);
        client
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_items(&self, missing: Vec<MediaItem>, cutoff: Vec<MediaItem>) {
        let mut state = self.state();
        state.missing = missing;
        state.cutoff = cutoff;
    }

    /// Make every missing fetch fail.
    pub fn fail_missing(&self, error: ArrError) {
        self.state().missing_error = Some(error);
    }

    /// Make every cutoff fetch fail.
    pub fn fail_cutoff(&self, error: ArrError) {
        self.state().cutoff_error = Some(error);
    }

    pub fn fail_connection(&self, error: ArrError) {
        self.state().connection_error = Some(error);
    }

    /// Queue a failure for the next unscripted trigger call.
    pub fn push_trigger_error(&self, error: ArrError) {
        self.state().trigger_script.push_back(Err(error));
    }

    /// Queue a success, to interleave with queued failures.
    pub fn push_trigger_ok(&self) {
        self.state().trigger_script.push_back(Ok(()));
    }

    /// Latency added to every call.
    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = delay;
    }

    /// Ids of every trigger call, in call order.
    pub fn trigger_calls(&self) -> Vec<Vec<i64>> {
        self.state().trigger_calls.clone()
    }

    pub fn missing_fetch_count(&self) -> usize {
        self.state().missing_fetches
    }

    pub fn cutoff_fetch_count(&self) -> usize {
        self.state().cutoff_fetches
    }

    async fn pause(&self) {
        let delay = self.state().delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ArrClient for MockArrClient {
    async fn test_connection(&self) -> Result<SystemStatus, ArrError> {
        self.pause().await;
        match self.state().connection_error.clone() {
            Some(e) => Err(e),
            None => Ok(SystemStatus {
                app_name: "Mock".to_string(),
                version: "0.0.0".to_string(),
            }),
        }
    }

    async fn fetch_all_missing(&self) -> Result<Vec<MediaItem>, ArrError> {
        self.pause().await;
        let mut state = self.state();
        state.missing_fetches += 1;
        match state.missing_error.clone() {
            Some(e) => Err(e),
            None => Ok(state.missing.clone()),
        }
    }

    async fn fetch_all_cutoff_unmet(&self) -> Result<Vec<MediaItem>, ArrError> {
        self.pause().await;
        let mut state = self.state();
        state.cutoff_fetches += 1;
        match state.cutoff_error.clone() {
            Some(e) => Err(e),
            None => Ok(state.cutoff.clone()),
        }
    }

    async fn trigger_search(&self, ids: &[i64]) -> Result<(), ArrError> {
        self.pause().await;
        let mut state = self.state();
        state.trigger_calls.push(ids.to_vec());
        state.trigger_script.pop_front().unwrap_or(Ok(()))
    }
}

/// Factory handing out registered mocks by server name.
///
/// Unknown names fail with `ConnectionFailed`.
#[derive(Debug, Clone, Default)]
pub struct MockClientFactory {
    clients: Arc<Mutex<HashMap<String, MockArrClient>>>,
}

impl MockClientFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, server: &str, client: MockArrClient) {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(server.to_string(), client);
    }

    pub fn client(&self, server: &str) -> Option<MockArrClient> {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(server)
            .cloned()
    }
}

impl ClientFactory for MockClientFactory {
    fn client_for(&self, server: &LibraryServer) -> Result<Arc<dyn ArrClient>, ArrError> {
        match self.client(&server.name) {
            Some(client) => Ok(Arc::new(client)),
            None => Err(ArrError::ConnectionFailed(format!(
                "no mock registered for {}",
                server.name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_trigger_script_then_default_success() {
        let client = MockArrClient::new();
        client.push_trigger_error(ArrError::RateLimited { retry_after: None });

        assert!(client.trigger_search(&[1]).await.unwrap_err().is_rate_limited());
        assert!(client.trigger_search(&[2, 3]).await.is_ok());
        assert_eq!(client.trigger_calls(), vec![vec![1], vec![2, 3]]);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let client = MockArrClient::with_items(fixtures::movies(1, 2), vec![]);
        let factory = MockClientFactory::new();
        factory.insert("movies", client.clone());

        let built = factory
            .client_for(&fixtures::radarr_server("movies"))
            .unwrap();
        assert_eq!(built.fetch_all_missing().await.unwrap().len(), 2);
        assert_eq!(client.missing_fetch_count(), 1);

        assert!(factory.client_for(&fixtures::radarr_server("other")).is_err());
    }
}
