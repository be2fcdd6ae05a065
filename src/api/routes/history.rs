//! Snapshot history endpoint

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::{Value, json};

use super::events::LimitQuery;
use crate::api::{error::ApiResult, state::ApiState, utils::resolve_limit};
use crate::handle::normalize_handle;

/// GET /api/v1/accounts/:handle/history?limit=N
///
/// Most recent snapshots for one account, newest first
pub async fn snapshot_history(
    State(state): State<ApiState>,
    Path(handle): Path<String>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let handle = normalize_handle(&handle)?;

    let settings = state.settings_snapshot();
    let limit = resolve_limit(
        query.limit,
        settings.history_default_limit,
        settings.api_max_limit,
    )?;

    let snapshots = state.store.snapshot_history(&handle, limit).await?;

    Ok(Json(json!({
        "handle": handle,
        "snapshots": snapshots,
        "count": snapshots.len(),
    })))
}
