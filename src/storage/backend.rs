//! Storage contract for the monitor engine
//!
//! This module defines the [`MonitorStore`] trait that all storage
//! implementations must implement.

use async_trait::async_trait;

use crate::ProfileSnapshot;
use crate::detect::ChangeEvent;

use super::error::StorageResult;
use super::schema::{AccountRow, EventRow, FailureRow, SnapshotRow, WatchlistEntry};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: std::collections::HashMap<String, String>,
}

/// Trait for the monitor's durable store
///
/// The store owns five tables: accounts, snapshots, events, failures and
/// settings. Each operation is individually atomic; multi-statement writes
/// (snapshot + bookkeeping, failure + bookkeeping) run in one transaction
/// so no reader ever sees a fresh snapshot next to a stale `last_error`.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the scheduler and request
/// handlers call into the store concurrently. Concurrent writes for
/// different accounts must not corrupt state; concurrent writes for the
/// same account land in write order (last write wins for bookkeeping).
///
/// ## Implicit registration
///
/// Writing a snapshot or a failure for a never-seen handle registers the
/// account as active. The foreign keys are soft: no referential integrity
/// is enforced between tables.
#[async_trait]
pub trait MonitorStore: Send + Sync {
    /// Register a handle on the watchlist (upsert, idempotent)
    ///
    /// Re-adding a deactivated handle simply flips its active flag back on.
    async fn add_account(&self, handle: &str) -> StorageResult<()>;

    /// Soft-delete a handle from the watchlist
    ///
    /// Returns `false` when the handle is unknown or already inactive,
    /// without creating a row.
    async fn deactivate_account(&self, handle: &str) -> StorageResult<bool>;

    /// All active accounts, ordered by handle (case-insensitive)
    async fn list_active_accounts(&self) -> StorageResult<Vec<AccountRow>>;

    /// Active accounts left-joined with their latest snapshot
    ///
    /// Accounts that have never been checked appear with a `None` snapshot.
    async fn list_watchlist(&self) -> StorageResult<Vec<WatchlistEntry>>;

    /// The most recent snapshot for a handle, by highest id
    async fn latest_snapshot(&self, handle: &str) -> StorageResult<Option<SnapshotRow>>;

    /// Persist one observation, timestamped at write time
    ///
    /// Runs in a single transaction: upserts the account, inserts the
    /// snapshot row, bumps `last_checked_at` and clears `last_error`.
    /// Returns the row as written.
    async fn save_snapshot(&self, profile: &ProfileSnapshot) -> StorageResult<SnapshotRow>;

    /// The most recent `limit` snapshots for a handle, newest first
    async fn snapshot_history(&self, handle: &str, limit: usize)
    -> StorageResult<Vec<SnapshotRow>>;

    /// Persist a batch of detected changes under one shared timestamp
    ///
    /// No-op for an empty slice.
    async fn record_events(&self, handle: &str, events: &[ChangeEvent]) -> StorageResult<()>;

    /// Persist one failed check
    ///
    /// Runs in a single transaction: upserts the account, inserts the
    /// failure row, bumps `last_checked_at` and sets `last_error`.
    async fn record_failure(&self, handle: &str, error: &str) -> StorageResult<()>;

    /// The most recent `limit` events across all accounts, newest first
    async fn recent_events(&self, limit: usize) -> StorageResult<Vec<EventRow>>;

    /// The most recent `limit` failures across all accounts, newest first
    async fn recent_failures(&self, limit: usize) -> StorageResult<Vec<FailureRow>>;

    /// Read one setting value
    async fn get_setting(&self, key: &str) -> StorageResult<Option<String>>;

    /// Upsert one setting value
    async fn set_setting(&self, key: &str, value: &str) -> StorageResult<()>;

    /// All settings as (key, value) pairs, ordered by key
    async fn all_settings(&self) -> StorageResult<Vec<(String, String)>>;

    /// Destructive reset: clear accounts, snapshots, events and failures
    ///
    /// Settings survive a reset. Callers are responsible for checking the
    /// scheduler is stopped first; the store itself trusts its inputs.
    async fn clear_all(&self) -> StorageResult<()>;

    /// Check backend health with a lightweight operation
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Human-readable backend statistics
    async fn stats(&self) -> StorageResult<String>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
