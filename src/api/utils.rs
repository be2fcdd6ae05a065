//! Shared helpers for API handlers

use super::error::ApiError;

/// Resolve a caller-supplied row limit against configured bounds
///
/// A missing limit falls back to `default_limit` (capped at `max_limit`);
/// an explicit limit outside `[1, max_limit]` is rejected before it ever
/// reaches the store.
pub fn resolve_limit(
    requested: Option<usize>,
    default_limit: usize,
    max_limit: usize,
) -> Result<usize, ApiError> {
    let Some(limit) = requested else {
        return Ok(default_limit.min(max_limit));
    };

    if limit < 1 || limit > max_limit {
        return Err(ApiError::InvalidRequest(format!(
            "limit must be between 1 and {}.",
            max_limit
        )));
    }

    Ok(limit)
}
