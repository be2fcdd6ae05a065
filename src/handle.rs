//! Handle normalization and validation
//!
//! Every caller-facing edge (API, fetcher, CLI) funnels handles through
//! [`normalize_handle`] so that the store only ever sees canonical
//! lowercase handles.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._]{2,24}$").expect("invalid handle regex"));

/// Error raised for handles that cannot be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleError {
    handle: String,
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid handle: {:?}", self.handle)
    }
}

impl std::error::Error for HandleError {}

/// Normalize a raw handle to its canonical form
///
/// Strips surrounding whitespace and a leading `@`, lowercases, and
/// validates against `[a-z0-9._]{2,24}`. Returns the canonical handle or
/// a [`HandleError`] naming the rejected input.
pub fn normalize_handle(raw: &str) -> Result<String, HandleError> {
    let normalized = raw.trim().trim_start_matches('@').to_lowercase();

    if HANDLE_RE.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(HandleError {
            handle: raw.to_string(),
        })
    }
}
