//! Request metrics for the API router.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// One slot of the in-flight gauge, held until dropped.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        HTTP_REQUESTS_IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        HTTP_REQUESTS_IN_FLIGHT.dec();
    }
}

/// Labels by method, normalized route and status code.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().as_str().to_owned();
    let route = normalize_path(request.uri().path());
    let started = Instant::now();

    let response = {
        let _slot = InFlight::enter();
        next.run(request).await
    };

    let status = response.status();
    let labels = [method.as_str(), route.as_str(), status.as_str()];
    HTTP_REQUEST_DURATION
        .with_label_values(&labels)
        .observe(started.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL.with_label_values(&labels).inc();

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_requests_are_counted_with_normalized_path() {
        let app = Router::new()
            .route("/api/v1/servers/{name}/test", get(dummy_handler))
            .layer(middleware::from_fn(metrics_middleware));

        let before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/api/v1/servers/{name}/test", "200"])
            .get();

        let request = Request::builder()
            .uri("/api/v1/servers/radarr-main/test")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/api/v1/servers/{name}/test", "200"])
            .get();
        assert_eq!(after, before + 1);
    }
}
