//! Testing utilities and mock implementations.
//!
//! Mocks for the library server client and the activity log, so cycles can
//! run end to end without real Radarr or Sonarr instances.
//!
//! # Example
//!
//! ```rust,ignore
//! use sweeparr_core::testing::{fixtures, MockArrClient, MockClientFactory};
//!
//! let client = MockArrClient::with_items(fixtures::movies(1, 20), vec![]);
//! client.push_trigger_error(ArrError::RateLimited { retry_after: None });
//!
//! let factory = MockClientFactory::new();
//! factory.insert("movies", client.clone());
//!
//! // ... run a cycle ...
//! assert_eq!(client.trigger_calls().len(), 2);
//! ```

mod mock_activity;
mod mock_arr;

pub use mock_activity::RecordingActivityLog;
pub use mock_arr::{MockArrClient, MockClientFactory};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::arr::{EpisodeItem, MediaItem, MovieItem, ServerKind};
    use crate::config::LibraryServer;

    fn server(name: &str, kind: ServerKind, port: u16) -> LibraryServer {
        LibraryServer {
            name: name.to_string(),
            kind,
            url: format!("http://localhost:{}", port),
            api_key: "test-api-key".to_string(),
            enabled: true,
            timeout_secs: 30,
            page_size: 250,
        }
    }

    /// Enabled Radarr server on the default port.
    pub fn radarr_server(name: &str) -> LibraryServer {
        server(name, ServerKind::Radarr, 7878)
    }

    /// Enabled Sonarr server on the default port.
    pub fn sonarr_server(name: &str) -> LibraryServer {
        server(name, ServerKind::Sonarr, 8989)
    }

    /// A movie released in 2000.
    pub fn movie(id: i64, title: &str) -> MediaItem {
        MediaItem::Movie(MovieItem {
            id,
            title: title.to_string(),
            year: Some(2000),
            quality_profile: "HD-1080p".to_string(),
        })
    }

    /// `count` movies with consecutive ids, titled "Movie {id}".
    pub fn movies(start_id: i64, count: usize) -> Vec<MediaItem> {
        (0..count as i64)
            .map(|i| movie(start_id + i, &format!("Movie {}", start_id + i)))
            .collect()
    }

    pub fn episode(id: i64, series: &str, season: u32, number: u32) -> MediaItem {
        MediaItem::Episode(EpisodeItem {
            id,
            series_title: series.to_string(),
            season_number: season,
            episode_number: number,
            title: format!("Episode {}", number),
            quality_profile: "HD-720p".to_string(),
        })
    }

    /// `count` season-one episodes of "Test Series" with consecutive ids.
    pub fn episodes(start_id: i64, count: usize) -> Vec<MediaItem> {
        (0..count as u32)
            .map(|i| episode(start_id + i as i64, "Test Series", 1, i + 1))
            .collect()
    }
}
