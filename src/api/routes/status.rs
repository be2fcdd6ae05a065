//! Monitor status endpoint

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState};

/// GET /api/v1/status
///
/// Scheduler state plus the current settings; safe to call while a cycle
/// is in flight.
pub async fn get_status(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let status = state.monitor.status();
    let settings = state.settings_snapshot();

    Ok(Json(json!({
        "monitor": status,
        "settings": settings,
        "storage": state.store.stats().await?,
    })))
}
