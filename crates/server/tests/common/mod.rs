//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock library servers injected, enabling E2E testing without a real
//! Radarr or Sonarr instance.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sweeparr_core::{
    config::{DatabaseConfig, HttpConfig},
    create_activity_system, ActivityLog, ActivityStore, ArrDetector, ArrSearchTrigger,
    AutomationConfig, AutomationOrchestrator, ClientFactory, Config, CycleScheduler,
    LibraryServer, SharedSettings, SqliteActivityStore,
    testing::MockClientFactory,
};
use sweeparr_server::state::AppState;

/// Re-export fixtures for test convenience
pub use sweeparr_core::testing::{fixtures, MockArrClient};

/// Test fixture for E2E testing with mock library servers.
///
/// Register a `MockArrClient` per configured server name through
/// `factory`; servers without a mock fail with a connection error.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_manual_run() {
///     let fixture = TestFixture::with_servers(vec![fixtures::radarr_server("movies")]).await;
///     fixture.factory.insert("movies", MockArrClient::with_items(fixtures::movies(1, 3), vec![]));
///
///     let response = fixture.post("/api/v1/automation/run", json!({})).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock client factory - register library servers here
    pub factory: MockClientFactory,
    pub scheduler: Arc<CycleScheduler>,
    pub store: Arc<SqliteActivityStore>,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Fixture with no library servers and default automation settings.
    pub async fn new() -> Self {
        Self::with_config(Vec::new(), AutomationConfig::default()).await
    }

    pub async fn with_servers(servers: Vec<LibraryServer>) -> Self {
        Self::with_config(servers, AutomationConfig::default()).await
    }

    /// Create a test fixture with custom servers and automation settings.
    pub async fn with_config(servers: Vec<LibraryServer>, automation: AutomationConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            http: HttpConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            automation,
            servers,
        };

        let store = Arc::new(
            SqliteActivityStore::new(&db_path).expect("Failed to create activity store"),
        );
        let (activity_handle, activity_writer) =
            create_activity_system(Arc::clone(&store) as Arc<dyn ActivityStore>, 100);
        tokio::spawn(activity_writer.run());
        let activity: Arc<dyn ActivityLog> = Arc::new(activity_handle);

        let factory = MockClientFactory::new();
        let client_factory: Arc<dyn ClientFactory> = Arc::new(factory.clone());
        let settings = Arc::new(SharedSettings::from_config(&config));

        let detector = Arc::new(ArrDetector::new(settings.clone(), Arc::clone(&client_factory)));
        let trigger = Arc::new(
            ArrSearchTrigger::new(Arc::clone(&client_factory), Arc::clone(&activity))
                .with_batch_size(config.automation.trigger_batch_size)
                .with_call_delay(Duration::ZERO),
        );
        let orchestrator = Arc::new(AutomationOrchestrator::new(
            settings.clone(),
            detector,
            trigger,
            activity,
        ));
        let scheduler = Arc::new(CycleScheduler::new(orchestrator, settings.clone()));

        let state = Arc::new(AppState::new(
            config,
            settings,
            Arc::clone(&scheduler),
            Arc::clone(&store) as Arc<dyn ActivityStore>,
            client_factory,
        ));

        let router = sweeparr_server::api::create_router(state);

        Self {
            router,
            factory,
            scheduler,
            store,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a GET request and return the raw body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        (status, String::from_utf8_lossy(&body_bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
