//! Watchlist management endpoints

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{
    error::{ApiError, ApiResult},
    state::ApiState,
};
use crate::handle::normalize_handle;

#[derive(Debug, Deserialize)]
pub struct AddWatchRequest {
    pub handle: String,
}

/// GET /api/v1/watchlist
///
/// Active accounts with their latest snapshot (null for never-checked)
pub async fn list_watchlist(State(state): State<ApiState>) -> ApiResult<Json<Value>> {
    let watchlist = state.store.list_watchlist().await?;

    Ok(Json(json!({
        "watchlist": watchlist,
        "count": watchlist.len(),
    })))
}

/// POST /api/v1/watchlist
///
/// Register a handle; idempotent, reactivates soft-deleted entries
pub async fn add_watch(
    State(state): State<ApiState>,
    Json(request): Json<AddWatchRequest>,
) -> ApiResult<Json<Value>> {
    let handle = normalize_handle(&request.handle)?;
    state.store.add_account(&handle).await?;

    Ok(Json(json!({ "handle": handle, "active": true })))
}

/// DELETE /api/v1/watchlist/:handle
///
/// Soft-delete; 404 when the handle is not on the active watchlist
pub async fn remove_watch(
    State(state): State<ApiState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Value>> {
    let handle = normalize_handle(&handle)?;

    if !state.store.deactivate_account(&handle).await? {
        return Err(ApiError::NotFound(format!(
            "@{} is not on the active watchlist.",
            handle
        )));
    }

    Ok(Json(json!({ "handle": handle, "active": false })))
}

/// POST /api/v1/watchlist/:handle/check
///
/// On-demand single-account check, bypassing the cycle guard. The outcome
/// is reported in the body either way; failures are also persisted.
pub async fn check_watch_now(
    State(state): State<ApiState>,
    Path(handle): Path<String>,
) -> ApiResult<Json<Value>> {
    let handle = normalize_handle(&handle)?;
    let ok = state.monitor.check_account(&handle).await;

    Ok(Json(json!({ "handle": handle, "ok": ok })))
}
