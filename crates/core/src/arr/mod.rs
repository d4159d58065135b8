//! Library server clients.
//!
//! This module provides the `ArrClient` trait implemented once per server
//! family (Radarr for movies, Sonarr for episodes), plus a `ClientFactory`
//! used by detection and search triggering to build clients per cycle.

mod factory;
mod http;
mod radarr;
mod sonarr;
mod types;

pub use factory::HttpClientFactory;
pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;
pub use types::*;
