//! Recent events and failures endpoints

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::{error::ApiResult, state::ApiState, utils::resolve_limit};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// GET /api/v1/events?limit=N
///
/// Most recent change events across all accounts, newest first
pub async fn recent_events(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let settings = state.settings_snapshot();
    let limit = resolve_limit(query.limit, settings.api_default_limit, settings.api_max_limit)?;

    let events = state.store.recent_events(limit).await?;

    Ok(Json(json!({
        "events": events,
        "count": events.len(),
    })))
}

/// GET /api/v1/failures?limit=N
///
/// Most recent failed checks, newest first
pub async fn recent_failures(
    State(state): State<ApiState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Value>> {
    let settings = state.settings_snapshot();
    let limit = resolve_limit(query.limit, settings.api_default_limit, settings.api_max_limit)?;

    let failures = state.store.recent_failures(limit).await?;

    Ok(Json(json!({
        "failures": failures,
        "count": failures.len(),
    })))
}
