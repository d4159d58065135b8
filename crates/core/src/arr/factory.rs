//! Builds reqwest-backed clients for library servers.

use std::sync::Arc;

use crate::config::LibraryServer;

use super::{ArrClient, ArrError, ClientFactory, RadarrClient, ServerKind, SonarrClient};

/// Factory producing the HTTP client matching a server's family.
#[derive(Debug, Default, Clone)]
pub struct HttpClientFactory;

impl HttpClientFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ClientFactory for HttpClientFactory {
    fn client_for(&self, server: &LibraryServer) -> Result<Arc<dyn ArrClient>, ArrError> {
        match server.kind {
            ServerKind::Radarr => Ok(Arc::new(RadarrClient::new(server)?)),
            ServerKind::Sonarr => Ok(Arc::new(SonarrClient::new(server)?)),
        }
    }
}
