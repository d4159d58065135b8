//! HTTP plumbing shared by the Radarr and Sonarr clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::metrics::{ARR_REQUESTS, ARR_REQUEST_DURATION};

use super::ArrError;

/// Upper bound on pages walked per fetch, guards against a server that keeps
/// reporting more records than it returns.
const MAX_PAGES: u32 = 1000;

/// One page of a `/wanted/*` listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub total_records: u64,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

/// Quality profile as returned by `/api/v3/qualityprofile`.
#[derive(Debug, Deserialize)]
pub(crate) struct QualityProfile {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSystemStatus {
    #[serde(default)]
    app_name: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

fn observe(endpoint: &str, start: std::time::Instant, ok: bool) {
    ARR_REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(start.elapsed().as_secs_f64());
    ARR_REQUESTS
        .with_label_values(&[endpoint, if ok { "success" } else { "error" }])
        .inc();
}

/// Thin authenticated JSON client for a `*arr` v3 API.
pub(crate) struct ArrHttp {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl ArrHttp {
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout: Duration,
        page_size: u32,
    ) -> Result<Self, ArrError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ArrError::ConnectionFailed(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            page_size: page_size.max(1),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v3{}", self.base_url, endpoint)
    }

    /// GET an endpoint and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ArrError> {
        let start = std::time::Instant::now();
        let result = async {
            let response = self
                .client
                .get(self.url(endpoint))
                .header("X-Api-Key", &self.api_key)
                .query(query)
                .send()
                .await
                .map_err(ArrError::from_reqwest)?;

            let response = check_status(response).await?;
            response
                .json()
                .await
                .map_err(|e| ArrError::InvalidResponse(e.to_string()))
        }
        .await;
        observe(endpoint, start, result.is_ok());
        result
    }

    /// POST a JSON body, discarding the response body.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<(), ArrError> {
        let start = std::time::Instant::now();
        let result = async {
            let response = self
                .client
                .post(self.url(endpoint))
                .header("X-Api-Key", &self.api_key)
                .json(body)
                .send()
                .await
                .map_err(ArrError::from_reqwest)?;

            check_status(response).await.map(|_| ())
        }
        .await;
        observe(endpoint, start, result.is_ok());
        result
    }

    /// Walk every page of a paged endpoint, preserving remote order.
    pub async fn fetch_paged<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        extra: &[(&str, &str)],
    ) -> Result<Vec<T>, ArrError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let mut query: Vec<(&str, String)> = vec![
                ("page", page.to_string()),
                ("pageSize", self.page_size.to_string()),
                ("sortKey", "id".to_string()),
                ("sortDirection", "ascending".to_string()),
            ];
            query.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));

            let body: Page<T> = self.get_json(endpoint, &query).await?;
            let received = body.records.len();
            all.extend(body.records);

            debug!(
                endpoint = endpoint,
                page = page,
                received = received,
                total = body.total_records,
                "Fetched page"
            );

            if received == 0 || all.len() as u64 >= body.total_records || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(all)
    }

    pub async fn system_status(&self) -> Result<super::SystemStatus, ArrError> {
        let raw: RawSystemStatus = self.get_json("/system/status", &[]).await?;
        Ok(super::SystemStatus {
            app_name: raw.app_name.unwrap_or_else(|| "unknown".to_string()),
            version: raw.version.unwrap_or_else(|| "unknown".to_string()),
        })
    }

    pub async fn quality_profiles(&self) -> Result<Vec<QualityProfile>, ArrError> {
        self.get_json("/qualityprofile", &[]).await
    }
}

/// Turn non-success statuses into typed errors.
async fn check_status(response: Response) -> Result<Response, ArrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(ArrError::RateLimited { retry_after })
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ArrError::AuthenticationFailed(
            format!("HTTP {}: check the API key", status),
        )),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(ArrError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )))
        }
    }
}

/// Resolve a profile id to its name, falling back to a placeholder.
pub(crate) fn profile_name(profiles: &[QualityProfile], id: Option<i64>) -> String {
    id.and_then(|id| profiles.iter().find(|p| p.id == id))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn paged(Query(q): Query<HashMap<String, String>>, headers: HeaderMap) -> impl IntoResponse {
        if headers.get("x-api-key").map(|v| v.as_bytes()) != Some(&b"secret"[..]) {
            return (AxumStatus::UNAUTHORIZED, Json(json!({}))).into_response();
        }
        let page: u64 = q.get("page").unwrap().parse().unwrap();
        let size: u64 = q.get("pageSize").unwrap().parse().unwrap();
        let total = 5u64;
        let start = (page - 1) * size;
        let records: Vec<_> = (start..(start + size).min(total))
            .map(|i| json!({ "id": i + 1 }))
            .collect();
        Json(json!({ "page": page, "pageSize": size, "totalRecords": total, "records": records }))
            .into_response()
    }

    #[derive(Debug, Deserialize)]
    struct Record {
        id: i64,
    }

    #[tokio::test]
    async fn test_fetch_paged_walks_all_pages_in_order() {
        let base = serve(Router::new().route("/api/v3/wanted/missing", get(paged))).await;
        let http = ArrHttp::new(&base, "secret", Duration::from_secs(5), 2).unwrap();

        let records: Vec<Record> = http.fetch_paged("/wanted/missing", &[]).await.unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_wrong_api_key_is_authentication_failure() {
        let base = serve(Router::new().route("/api/v3/wanted/missing", get(paged))).await;
        let http = ArrHttp::new(&base, "wrong", Duration::from_secs(5), 2).unwrap();

        let result: Result<Vec<Record>, _> = http.fetch_paged("/wanted/missing", &[]).await;
        assert!(matches!(result, Err(ArrError::AuthenticationFailed(_))));
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited_with_retry_after() {
        let router = Router::new().route(
            "/api/v3/system/status",
            get(|| async { (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "12")], "slow down") }),
        );
        let base = serve(router).await;
        let http = ArrHttp::new(&base, "secret", Duration::from_secs(5), 10).unwrap();

        let err = http.system_status().await.unwrap_err();
        match err {
            ArrError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(12)));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_includes_truncated_body() {
        let router = Router::new().route(
            "/api/v3/system/status",
            get(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "database is locked") }),
        );
        let base = serve(router).await;
        let http = ArrHttp::new(&base, "secret", Duration::from_secs(5), 10).unwrap();

        let err = http.system_status().await.unwrap_err();
        assert!(matches!(err, ArrError::ApiError(ref m) if m.contains("database is locked")));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let http = ArrHttp::new("http://127.0.0.1:1", "secret", Duration::from_secs(2), 10).unwrap();
        let err = http.system_status().await.unwrap_err();
        assert!(matches!(err, ArrError::ConnectionFailed(_) | ArrError::ApiError(_)));
    }

    #[test]
    fn test_profile_name_lookup() {
        let profiles = vec![
            QualityProfile { id: 1, name: "Any".to_string() },
            QualityProfile { id: 4, name: "HD-1080p".to_string() },
        ];
        assert_eq!(profile_name(&profiles, Some(4)), "HD-1080p");
        assert_eq!(profile_name(&profiles, Some(9)), "Unknown");
        assert_eq!(profile_name(&profiles, None), "Unknown");
    }
}
