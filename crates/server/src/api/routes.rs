use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{activity, automation, handlers, middleware::metrics_middleware, servers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Automation (scheduler and manual cycles)
        .route("/automation/status", get(automation::get_status))
        .route("/automation/start", post(automation::start))
        .route("/automation/stop", post(automation::stop))
        .route("/automation/run", post(automation::run_cycle))
        .route("/automation/settings", get(automation::get_settings))
        .route("/automation/settings", put(automation::update_settings))
        // Library servers
        .route("/servers", get(servers::list_servers))
        .route("/servers/{name}", put(servers::update_server))
        .route("/servers/{name}/test", post(servers::test_server))
        // Activity log
        .route("/activity", get(activity::query_activity));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
