//! Radarr client implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LibraryServer;

use super::http::{profile_name, ArrHttp, QualityProfile};
use super::{ArrClient, ArrError, MediaItem, MovieItem, SystemStatus};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    year: Option<u32>,
    #[serde(default)]
    quality_profile_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MoviesSearchCommand<'a> {
    name: &'static str,
    movie_ids: &'a [i64],
}

/// Radarr v3 API client.
pub struct RadarrClient {
    name: String,
    http: ArrHttp,
}

impl RadarrClient {
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
        let movies: Vec<RadarrMovie> = self
            .http
            .fetch_paged(endpoint, &[("monitored", "true")])
            .await?;

        debug!(
            server = %self.name,
            endpoint = endpoint,
            count = movies.len(),
            "Radarr wanted list fetched"
        );
        Ok(movies
            .into_iter()
            .map(|m| to_media_item(m, &profiles))
            .collect())
    }
}

fn to_media_item(movie: RadarrMovie, profiles: &[QualityProfile]) -> MediaItem {
    MediaItem::Movie(MovieItem {
        id: movie.id,
        title: movie.title,
        year: movie.year.filter(|y| *y > 0),
        quality_profile: profile_name(profiles, movie.quality_profile_id),
    })
}

#[async_trait]
impl ArrClient for RadarrClient {
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
        let command = MoviesSearchCommand {
            name: "MoviesSearch",
            movie_ids: ids,
        };
        self.http.post_json("/command", &command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use axum::{
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn radarr_router(commands: Arc<Mutex<Vec<Value>>>) -> Router {
        Router::new()
            .route(
                "/api/v3/qualityprofile",
                get(|| async { Json(json!([{ "id": 4, "name": "HD-1080p" }])) }),
            )
            .route(
                "/api/v3/wanted/missing",
                get(|| async {
                    Json(json!({
                        "page": 1,
                        "totalRecords": 2,
                        "records": [
                            { "id": 11, "title": "Heat", "year": 1995, "qualityProfileId": 4 },
                            { "id": 12, "title": "Ronin", "year": 0, "qualityProfileId": 9 }
                        ]
                    }))
                }),
            )
            .route(
                "/api/v3/command",
                post(move |Json(body): Json<Value>| {
                    let commands = Arc::clone(&commands);
                    async move {
                        commands.lock().unwrap().push(body);
                        Json(json!({ "id": 1, "status": "queued" }))
                    }
                }),
            )
    }

    #[tokio::test]
    async fn test_fetch_missing_maps_movies() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let base = serve(radarr_router(Arc::clone(&commands))).await;
        let mut server = fixtures::radarr_server("movies");
        server.url = base;

        let client = RadarrClient::new(&server).unwrap();
        let items = client.fetch_all_missing().await.unwrap();

        assert_eq!(items.len(), 2);
        match &items[0] {
            MediaItem::Movie(m) => {
                assert_eq!(m.id, 11);
                assert_eq!(m.year, Some(1995));
                assert_eq!(m.quality_profile, "HD-1080p");
            }
            other => panic!("expected movie, got {other:?}"),
        }
        match &items[1] {
            MediaItem::Movie(m) => {
                assert_eq!(m.year, None);
                assert_eq!(m.quality_profile, "Unknown");
            }
            other => panic!("expected movie, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trigger_search_posts_movies_search_command() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let base = serve(radarr_router(Arc::clone(&commands))).await;
        let mut server = fixtures::radarr_server("movies");
        server.url = base;

        let client = RadarrClient::new(&server).unwrap();
        client.trigger_search(&[11, 12]).await.unwrap();

        let recorded = commands.lock().unwrap().clone();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0]["name"], "MoviesSearch");
        assert_eq!(recorded[0]["movieIds"], json!([11, 12]));
    }

    #[tokio::test]
    async fn test_trigger_search_with_no_ids_is_noop() {
        let commands = Arc::new(Mutex::new(Vec::new()));
        let base = serve(radarr_router(Arc::clone(&commands))).await;
        let mut server = fixtures::radarr_server("movies");
        server.url = base;

        let client = RadarrClient::new(&server).unwrap();
        client.trigger_search(&[]).await.unwrap();
        assert!(commands.lock().unwrap().is_empty());
    }
}
