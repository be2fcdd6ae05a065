//! Typed row definitions for the durable store
//!
//! Every table maps to one explicit struct here. Rows are immutable once
//! written; the only mutable state in the store is the per-account
//! bookkeeping on `watch_accounts` (active flag, last check, last error).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked account with its bookkeeping fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRow {
    /// Canonical handle (lowercase, unique)
    pub handle: String,

    /// When the account was first registered (always UTC)
    pub created_at: DateTime<Utc>,

    /// Soft-delete flag; deactivated accounts keep their history
    pub active: bool,

    /// When the account was last checked, success or failure
    pub last_checked_at: Option<DateTime<Utc>>,

    /// Error text from the last failed check; cleared on success
    pub last_error: Option<String>,
}

/// One stored profile observation
///
/// "Latest" for an account means the row with the highest `id`, not the
/// newest `checked_at`; ids are monotonically increasing in write order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: i64,
    pub handle: String,
    pub checked_at: DateTime<Utc>,
    pub nickname: Option<String>,
    pub bio: Option<String>,
    pub verified: bool,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub likes: Option<i64>,
    pub videos_count: Option<i64>,
    pub profile_url: String,
}

/// One detected field-level change between two consecutive snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: i64,
    pub handle: String,
    pub detected_at: DateTime<Utc>,
    pub metric: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub delta: Option<i64>,
    pub message: String,
}

/// One failed check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRow {
    pub id: i64,
    pub handle: String,
    pub checked_at: DateTime<Utc>,
    pub error: String,
}

/// An active account joined with its latest snapshot (if any)
///
/// Accounts that have never been checked appear with `latest: None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    #[serde(flatten)]
    pub account: AccountRow,
    pub latest: Option<SnapshotRow>,
}
