//! Scheduler control endpoints

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::monitor::CycleOutcome;

/// POST /api/v1/monitor/run
///
/// Execute one cycle synchronously; 409 when a cycle is already in flight
pub async fn run_now(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    match state.monitor.run_once().await {
        CycleOutcome::Busy => Err(ApiError::Conflict(
            "A monitor cycle is already in flight.".to_string(),
        )),
        CycleOutcome::Completed(summary) => Ok(Json(json!({
            "status": "ok",
            "summary": summary,
        }))),
    }
}

/// POST /api/v1/monitor/start
pub async fn start_monitor(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    if !state.monitor.start() {
        return Err(ApiError::Conflict("Monitor is already running.".to_string()));
    }

    Ok(Json(json!({ "running": true })))
}

/// POST /api/v1/monitor/stop
pub async fn stop_monitor(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    if !state.monitor.stop().await {
        return Err(ApiError::Conflict("Monitor is not running.".to_string()));
    }

    Ok(Json(json!({ "running": false })))
}

/// POST /api/v1/reset
///
/// Destructive data reset; rejected with 409 while the scheduler runs
pub async fn reset_data(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    if !state.monitor.reset_data().await? {
        return Err(ApiError::Conflict(
            "Stop the monitor before clearing data.".to_string(),
        ));
    }

    Ok(Json(json!({ "cleared": true })))
}
