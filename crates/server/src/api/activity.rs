use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sweeparr_core::{ActivityFilter, ActivityRecord};

use super::handlers::ErrorResponse;
use crate::state::AppState;

/// Maximum allowed limit for activity queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for activity queries
const DEFAULT_LIMIT: i64 = 100;

/// Query parameters for activity endpoint
#[derive(Debug, Deserialize)]
pub struct ActivityQueryParams {
    /// Filter by cycle ID
    pub cycle_id: Option<String>,
    /// Filter by event type
    pub event_type: Option<String>,
    /// Filter by server name
    pub server: Option<String>,
    /// Filter events after this timestamp (ISO 8601)
    pub from: Option<DateTime<Utc>>,
    /// Filter events before this timestamp (ISO 8601)
    pub to: Option<DateTime<Utc>>,
    /// Maximum number of events to return (default 100, max 1000)
    pub limit: Option<i64>,
    /// Pagination offset (default 0)
    pub offset: Option<i64>,
}

/// Response for activity query endpoint
#[derive(Debug, Serialize)]
pub struct ActivityQueryResponse {
    /// Matching events, newest first
    pub events: Vec<ActivityRecord>,
    /// Total number of matching events
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Query the activity log
pub async fn query_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityQueryParams>,
) -> Result<Json<ActivityQueryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    // Shared between query and count
    let mut base_filter = ActivityFilter::new();

    if let Some(cycle_id) = params.cycle_id {
        base_filter = base_filter.with_cycle_id(cycle_id);
    }

    if let Some(event_type) = params.event_type {
        base_filter = base_filter.with_event_type(event_type);
    }

    if let Some(server) = params.server {
        base_filter = base_filter.with_server(server);
    }

    if params.from.is_some() || params.to.is_some() {
        base_filter = base_filter.with_time_range(params.from, params.to);
    }

    let query_filter = base_filter.clone().with_limit(limit).with_offset(offset);

    let events = state.activity_store().query(&query_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!(
                "Failed to query activity events: {}",
                e
            ))),
        )
    })?;

    let total = state.activity_store().count(&base_filter).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(format!(
                "Failed to count activity events: {}",
                e
            ))),
        )
    })?;

    Ok(Json(ActivityQueryResponse {
        events,
        total,
        limit,
        offset,
    }))
}
