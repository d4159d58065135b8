//! Sonarr client implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LibraryServer;

use super::http::{profile_name, ArrHttp, QualityProfile};
use super::{ArrClient, ArrError, EpisodeItem, MediaItem, SystemStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    #[serde(default)]
    title: String,
    #[serde(default)]
    quality_profile_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrEpisode {
    id: i64,
    #[serde(default)]
    season_number: u32,
    #[serde(default)]
    episode_number: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    series: Option<SonarrSeries>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EpisodeSearchCommand<'a> {
    name: &'static str,
    episode_ids: &'a [i64],
}

/// Sonarr v3 API client.
pub struct SonarrClient {
    name: String,
    http: ArrHttp,
}

impl SonarrClient {
    pub fn new(server: &LibraryServer) -> Result<Self, ArrError> {
        let http = ArrHttp::new(
            &server.url,
            &server.api_key,
            Duration::from_secs(server.timeout_secs as u64),
            server.page_size,
        )?;
        Ok(Self {
            name: server.name.clone(),
            http,
        })
    }

    async fn fetch_wanted(&self, endpoint: &str) -> Result<Vec<MediaItem>, ArrError> {
        let profiles = self.http.quality_profiles().await?;
        let episodes: Vec<SonarrEpisode> = self
            .http
            .fetch_paged(endpoint, &[("includeSeries", "true"), ("monitored", "true")])
            .await?;

        debug!(
            server = %self.name,
            endpoint = endpoint,
            count = episodes.len(),
            "Sonarr wanted list fetched"
        );
        Ok(episodes
            .into_iter()
            .map(|e| to_media_item(e, &profiles))
            .collect())
    }
}

fn to_media_item(episode: SonarrEpisode, profiles: &[QualityProfile]) -> MediaItem {
    let (series_title, profile_id) = match episode.series {
        Some(series) => (series.title, series.quality_profile_id),
        None => ("Unknown Series".to_string(), None),
    };
    MediaItem::Episode(EpisodeItem {
        id: episode.id,
        series_title,
        season_number: episode.season_number,
        episode_number: episode.episode_number,
        title: episode.title,
        quality_profile: profile_name(profiles, profile_id),
    })
}

#[async_trait]
impl ArrClient for SonarrClient {
    async fn test_connection(&self) -> Result<SystemStatus, ArrError> {
        self.http.system_status().await
    }

    async fn fetch_all_missing(&self) -> Result<Vec<MediaItem>, ArrError> {
        self.fetch_wanted("/wanted/missing").await
    }

    async fn fetch_all_cutoff_unmet(&self) -> Result<Vec<MediaItem>, ArrError> {
        self.fetch_wanted("/wanted/cutoff").await
    }

    async fn trigger_search(&self, ids: &[i64]) -> Result<(), ArrError> {
        if ids.is_empty() {
            return Ok(());
        }
        let command = EpisodeSearchCommand {
            name: "EpisodeSearch",
            episode_ids: ids,
        };
        self.http.post_json("/command", &command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use axum::{
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_cutoff_maps_episodes() {
        let router = Router::new()
            .route(
                "/api/v3/qualityprofile",
                get(|| async { Json(json!([{ "id": 2, "name": "HD-720p" }])) }),
            )
            .route(
                "/api/v3/wanted/cutoff",
                get(|| async {
                    Json(json!({
                        "totalRecords": 1,
                        "records": [{
                            "id": 301,
                            "seasonNumber": 1,
                            "episodeNumber": 3,
                            "title": "The Buys",
                            "series": { "title": "The Wire", "qualityProfileId": 2 }
                        }]
                    }))
                }),
            );
        let mut server = fixtures::sonarr_server("tv");
        server.url = serve(router).await;

        let client = SonarrClient::new(&server).unwrap();
        let items = client.fetch_all_cutoff_unmet().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].display_title(), "The Wire S01E03 - The Buys");
        assert_eq!(items[0].quality_profile(), "HD-720p");
    }

    #[tokio::test]
    async fn test_trigger_search_rate_limited() {
        let router = Router::new().route(
            "/api/v3/command",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "") }),
        );
        let mut server = fixtures::sonarr_server("tv");
        server.url = serve(router).await;

        let client = SonarrClient::new(&server).unwrap();
        let err = client.trigger_search(&[1, 2, 3]).await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_missing_series_falls_back() {
        let router = Router::new()
            .route("/api/v3/qualityprofile", get(|| async { Json(json!([])) }))
            .route(
                "/api/v3/wanted/missing",
                get(|| async {
                    Json(json!({
                        "totalRecords": 1,
                        "records": [{ "id": 5, "seasonNumber": 2, "episodeNumber": 1, "title": "Pilot" }]
                    }))
                }),
            );
        let mut server = fixtures::sonarr_server("tv");
        server.url = serve(router).await;

        let client = SonarrClient::new(&server).unwrap();
        let items = client.fetch_all_missing().await.unwrap();
        match &items[0] {
            MediaItem::Episode(e) => {
                assert_eq!(e.series_title, "Unknown Series");
                assert_eq!(e.quality_profile, "Unknown");
            }
            other => panic!("expected episode, got {other:?}"),
        }
    }
}
