//! Types for the library server client contract.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LibraryServer;

/// Errors that can occur talking to a library server.
#[derive(Debug, Clone, Error)]
pub enum ArrError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The server asked us to back off (HTTP 429).
    #[error("Rate limited{}", retry_after_suffix(.retry_after))]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request cancelled")]
    Cancelled,
}

fn retry_after_suffix(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(" (retry after {}s)", d.as_secs()),
        None => String::new(),
    }
}

impl ArrError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ArrError::RateLimited { .. })
    }

    /// Map a transport error the way every client does.
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ArrError::Timeout
        } else if e.is_connect() {
            ArrError::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            ArrError::InvalidResponse(e.to_string())
        } else {
            ArrError::ApiError(e.to_string())
        }
    }
}

/// Library server family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    /// Movie library manager.
    Radarr,
    /// TV series library manager.
    Sonarr,
}

impl ServerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::Radarr => "radarr",
            ServerKind::Sonarr => "sonarr",
        }
    }

    /// Shape of the items this family reports.
    pub fn media_kind(&self) -> MediaKind {
        match self {
            ServerKind::Radarr => MediaKind::Movie,
            ServerKind::Sonarr => MediaKind::Episode,
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item shape tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Episode,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Episode => "episode",
        }
    }
}

/// A movie reported by Radarr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieItem {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    pub quality_profile: String,
}

/// An episode reported by Sonarr.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeItem {
    pub id: i64,
    pub series_title: String,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    pub quality_profile: String,
}

/// A missing or cutoff-unmet item detected on a library server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaItem {
    Movie(MovieItem),
    Episode(EpisodeItem),
}

impl MediaItem {
    pub fn id(&self) -> i64 {
        match self {
            MediaItem::Movie(m) => m.id,
            MediaItem::Episode(e) => e.id,
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self {
            MediaItem::Movie(_) => MediaKind::Movie,
            MediaItem::Episode(_) => MediaKind::Episode,
        }
    }

    pub fn quality_profile(&self) -> &str {
        match self {
            MediaItem::Movie(m) => &m.quality_profile,
            MediaItem::Episode(e) => &e.quality_profile,
        }
    }

    /// Human readable title, e.g. "Heat (1995)" or "The Wire S01E03 - The Buys".
    pub fn display_title(&self) -> String {
        match self {
            MediaItem::Movie(m) => match m.year {
                Some(year) => format!("{} ({})", m.title, year),
                None => m.title.clone(),
            },
            MediaItem::Episode(e) => format!(
                "{} S{:02}E{:02} - {}",
                e.series_title, e.season_number, e.episode_number, e.title
            ),
        }
    }
}

/// Result of a successful connection test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub app_name: String,
    pub version: String,
}

/// Capability contract implemented once per server family.
///
/// Implementations page through the remote API transparently. Cancellation is
/// done by dropping the returned future, which aborts the in-flight request.
#[async_trait]
pub trait ArrClient: Send + Sync {
    /// Check the server is reachable and the API key is accepted.
    async fn test_connection(&self) -> Result<SystemStatus, ArrError>;

    /// Every monitored item without a file, in remote page order.
    async fn fetch_all_missing(&self) -> Result<Vec<MediaItem>, ArrError>;

    /// Every item whose file is below the quality cutoff, in remote page order.
    async fn fetch_all_cutoff_unmet(&self) -> Result<Vec<MediaItem>, ArrError>;

    /// Queue a search for the given item ids.
    async fn trigger_search(&self, ids: &[i64]) -> Result<(), ArrError>;
}

/// Builds a client for a server snapshot.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, server: &LibraryServer) -> Result<Arc<dyn ArrClient>, ArrError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_item_serialization_is_tagged() {
        let item = MediaItem::Movie(MovieItem {
            id: 7,
            title: "Heat".to_string(),
            year: Some(1995),
            quality_profile: "HD-1080p".to_string(),
        });
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["type"], "movie");
        assert_eq!(json["id"], 7);

        let parsed: MediaItem = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn test_display_title() {
        let movie = MediaItem::Movie(MovieItem {
            id: 1,
            title: "Heat".to_string(),
            year: Some(1995),
            quality_profile: "Any".to_string(),
        });
        assert_eq!(movie.display_title(), "Heat (1995)");

        let episode = MediaItem::Episode(EpisodeItem {
            id: 2,
            series_title: "The Wire".to_string(),
            season_number: 1,
            episode_number: 3,
            title: "The Buys".to_string(),
            quality_profile: "HD-720p".to_string(),
        });
        assert_eq!(episode.display_title(), "The Wire S01E03 - The Buys");
        assert_eq!(episode.kind(), MediaKind::Episode);
        assert_eq!(episode.quality_profile(), "HD-720p");
    }

    #[test]
    fn test_rate_limited_display() {
        let err = ArrError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.to_string(), "Rate limited (retry after 30s)");
        assert!(err.is_rate_limited());

        let err = ArrError::RateLimited { retry_after: None };
        assert_eq!(err.to_string(), "Rate limited");
        assert!(!ArrError::Timeout.is_rate_limited());
    }

    #[test]
    fn test_server_kind_media_kind() {
        assert_eq!(ServerKind::Radarr.media_kind(), MediaKind::Movie);
        assert_eq!(ServerKind::Sonarr.media_kind(), MediaKind::Episode);
        assert_eq!(ServerKind::Sonarr.to_string(), "sonarr");
    }
}
