//! Automation API handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use sweeparr_core::{
    AutomationConfig, CycleResult, SchedulerError, SchedulerStatus, SettingsProvider,
};
use tracing::{error, info};

use super::handlers::{ErrorResponse, MessageResponse};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn scheduler_error(e: SchedulerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        SchedulerError::AlreadyRunning
        | SchedulerError::NotRunning
        | SchedulerError::CycleActive => StatusCode::CONFLICT,
        SchedulerError::Cycle(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

/// Get scheduler status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status())
}

/// Start scheduled cycles
pub async fn start(State(state): State<Arc<AppState>>) -> ApiResult<MessageResponse> {
    state.scheduler().start().map_err(scheduler_error)?;
    Ok(Json(MessageResponse {
        message: "Scheduler started".to_string(),
    }))
}

/// Stop scheduled cycles. A cycle already running is left to finish.
pub async fn stop(State(state): State<Arc<AppState>>) -> ApiResult<MessageResponse> {
    state.scheduler().stop().map_err(scheduler_error)?;
    Ok(Json(MessageResponse {
        message: "Scheduler stopped".to_string(),
    }))
}

/// Run a cycle now and return its result.
///
/// A cycle that recorded failures still returns 200 with `success: false`;
/// 409 means another cycle holds the slot.
pub async fn run_cycle(State(state): State<Arc<AppState>>) -> ApiResult<CycleResult> {
    let scheduler = Arc::clone(state.scheduler());
    // Spawned so a client disconnect does not abort the cycle mid-way.
    let outcome = tokio::spawn(async move { scheduler.trigger_manual().await })
        .await
        .map_err(|e| {
            error!(error = %e, "Manual cycle task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(format!("cycle task failed: {}", e))),
            )
        })?;

    match outcome {
        Ok(result) => Ok(Json(result)),
        Err(SchedulerError::Cycle(failure)) => Ok(Json(failure.into_result())),
        Err(e) => Err(scheduler_error(e)),
    }
}

/// Current automation settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<AutomationConfig> {
    Json(state.settings().automation())
}

/// Replace automation settings. Applies from the next cycle and reschedule.
///
/// Batch size and call delay are fixed when the trigger is built at startup.
/// Omitting them keeps the running values; sending a different value is
/// rejected.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<AutomationConfig> {
    let bad_request =
        |message: String| (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)));

    let mut automation: AutomationConfig =
        serde_json::from_value(body.clone()).map_err(|e| bad_request(e.to_string()))?;
    let current = state.settings().automation();

    if body.get("trigger_batch_size").is_none() {
        automation.trigger_batch_size = current.trigger_batch_size;
    } else if automation.trigger_batch_size != current.trigger_batch_size {
        return Err(bad_request(
            "trigger_batch_size is fixed at startup; restart to change it".to_string(),
        ));
    }
    if body.get("trigger_delay_ms").is_none() {
        automation.trigger_delay_ms = current.trigger_delay_ms;
    } else if automation.trigger_delay_ms != current.trigger_delay_ms {
        return Err(bad_request(
            "trigger_delay_ms is fixed at startup; restart to change it".to_string(),
        ));
    }

    state
        .settings()
        .set_automation(automation.clone())
        .map_err(|e| bad_request(e.to_string()))?;

    info!(
        interval_secs = automation.interval_secs,
        dry_run = automation.dry_run,
        "Automation settings updated"
    );
    Ok(Json(automation))
}
