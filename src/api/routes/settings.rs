//! Settings endpoints

use std::collections::HashMap;

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::settings::Settings;

/// GET /api/v1/settings
pub async fn get_settings(State(state): State<ApiState>) -> Json<Settings> {
    Json(state.settings_snapshot())
}

/// PUT /api/v1/settings
///
/// Validate and apply a partial update. Accepted values are persisted and
/// take effect immediately where they can; restart-only keys are reported
/// back in `restart_required`.
pub async fn update_settings(
    State(state): State<ApiState>,
    Json(updates): Json<HashMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let current = state.settings_snapshot();
    let update = current
        .apply_update(&updates)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    update.settings.persist(state.store.as_ref()).await?;

    // The interval feeds the scheduler directly; it applies to the next
    // scheduled wait.
    state.monitor.set_interval(update.settings.monitor_interval_secs);

    *state.settings.write().expect("settings lock poisoned") = update.settings.clone();

    Ok(Json(json!({
        "settings": update.settings,
        "restart_required": update.restart_required,
    })))
}
