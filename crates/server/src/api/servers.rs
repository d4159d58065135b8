//! Library server API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sweeparr_core::{config::SanitizedServer, ServerKind};
use tracing::{info, warn};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Body for updating a server
#[derive(Debug, Deserialize)]
pub struct UpdateServerRequest {
    pub enabled: bool,
}

/// Connection test outcome
#[derive(Debug, Serialize)]
pub struct ConnectionTestResponse {
    pub server: String,
    pub kind: ServerKind,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn not_found(name: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("server not found: {}", name))),
    )
}

/// List configured servers (API keys redacted)
pub async fn list_servers(State(state): State<Arc<AppState>>) -> Json<Vec<SanitizedServer>> {
    Json(
        state
            .settings()
            .servers()
            .iter()
            .map(SanitizedServer::from)
            .collect(),
    )
}

/// Enable or disable a server. Applies from the next cycle.
pub async fn update_server(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<UpdateServerRequest>,
) -> Result<Json<SanitizedServer>, (StatusCode, Json<ErrorResponse>)> {
    if !state.settings().set_server_enabled(&name, request.enabled) {
        return Err(not_found(&name));
    }
    info!(server = %name, enabled = request.enabled, "Server updated");

    let server = state.settings().server(&name).ok_or_else(|| not_found(&name))?;
    Ok(Json(SanitizedServer::from(&server)))
}

/// Check that a server is reachable and accepts its API key.
///
/// Returns 502 with the failure reason when the server cannot be reached.
pub async fn test_server(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<ConnectionTestResponse>), (StatusCode, Json<ErrorResponse>)> {
    let server = state.settings().server(&name).ok_or_else(|| not_found(&name))?;

    let outcome = match state.client_factory().client_for(&server) {
        Ok(client) => client.test_connection().await,
        Err(e) => Err(e),
    };

    let response = match outcome {
        Ok(status) => {
            info!(server = %name, version = %status.version, "Connection test succeeded");
            (
                StatusCode::OK,
                Json(ConnectionTestResponse {
                    server: name,
                    kind: server.kind,
                    success: true,
                    app_name: Some(status.app_name),
                    version: Some(status.version),
                    error: None,
                }),
            )
        }
        Err(e) => {
            warn!(server = %name, error = %e, "Connection test failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ConnectionTestResponse {
                    server: name,
                    kind: server.kind,
                    success: false,
                    app_name: None,
                    version: None,
                    error: Some(e.to_string()),
                }),
            )
        }
    };

    Ok(response)
}
