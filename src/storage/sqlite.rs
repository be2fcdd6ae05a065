//! SQLite implementation of the monitor store
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Efficient resource usage
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Multi-statement writes (snapshot + account bookkeeping, failure +
//! account bookkeeping) run inside a single transaction, which is what
//! gives the engine its "no fresh snapshot next to a stale last_error"
//! guarantee.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use crate::ProfileSnapshot;
use crate::detect::ChangeEvent;

use super::backend::{HealthStatus, MonitorStore};
use super::error::{StorageError, StorageResult};
use super::schema::{AccountRow, EventRow, FailureRow, SnapshotRow, WatchlistEntry};

/// SQLite-backed monitor store
///
/// Stores the watchlist and all observation history in a local SQLite
/// database file. Suitable for a single hub process watching a few hundred
/// accounts.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Helper to convert a timestamp to Unix milliseconds for SQLite
    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    /// Helper to convert Unix milliseconds from SQLite to a DateTime
    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_account(row: &SqliteRow) -> AccountRow {
        AccountRow {
            handle: row.get("handle"),
            created_at: Self::millis_to_timestamp(row.get("created_at")),
            active: row.get::<i64, _>("active") != 0,
            last_checked_at: row
                .get::<Option<i64>, _>("last_checked_at")
                .map(Self::millis_to_timestamp),
            last_error: row.get("last_error"),
        }
    }

    fn row_to_snapshot(row: &SqliteRow) -> SnapshotRow {
        SnapshotRow {
            id: row.get("id"),
            handle: row.get("handle"),
            checked_at: Self::millis_to_timestamp(row.get("checked_at")),
            nickname: row.get("nickname"),
            bio: row.get("bio"),
            verified: row.get::<i64, _>("verified") != 0,
            followers: row.get("followers"),
            following: row.get("following"),
            likes: row.get("likes"),
            videos_count: row.get("videos_count"),
            profile_url: row.get("profile_url"),
        }
    }
}

#[async_trait]
impl MonitorStore for SqliteStore {
    #[instrument(skip(self))]
    async fn add_account(&self, handle: &str) -> StorageResult<()> {
        let now = Self::timestamp_to_millis(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO watch_accounts (handle, created_at, active)
            VALUES (?, ?, 1)
            ON CONFLICT (handle) DO UPDATE SET active = 1
            "#,
        )
        .bind(handle)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("account {} registered as active", handle);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn deactivate_account(&self, handle: &str) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE watch_accounts SET active = 0 WHERE handle = ? AND active = 1")
            .bind(handle)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_active_accounts(&self) -> StorageResult<Vec<AccountRow>> {
        let rows = sqlx::query(
            r#"
            SELECT handle, created_at, active, last_checked_at, last_error
            FROM watch_accounts
            WHERE active = 1
            ORDER BY handle COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_account).collect())
    }

    async fn list_watchlist(&self) -> StorageResult<Vec<WatchlistEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT
                w.handle, w.created_at, w.active, w.last_checked_at, w.last_error,
                s.id AS snapshot_id,
                s.checked_at AS snapshot_checked_at,
                s.nickname, s.bio, s.verified,
                s.followers, s.following, s.likes, s.videos_count,
                s.profile_url
            FROM watch_accounts w
            LEFT JOIN snapshots s
                ON s.id = (
                    SELECT id FROM snapshots
                    WHERE handle = w.handle
                    ORDER BY id DESC
                    LIMIT 1
                )
            WHERE w.active = 1
            ORDER BY w.handle COLLATE NOCASE ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let entries = rows
            .iter()
            .map(|row| {
                let account = Self::row_to_account(row);
                let latest = row.get::<Option<i64>, _>("snapshot_id").map(|id| SnapshotRow {
                    id,
                    handle: account.handle.clone(),
                    checked_at: Self::millis_to_timestamp(row.get("snapshot_checked_at")),
                    nickname: row.get("nickname"),
                    bio: row.get("bio"),
                    verified: row.get::<i64, _>("verified") != 0,
                    followers: row.get("followers"),
                    following: row.get("following"),
                    likes: row.get("likes"),
                    videos_count: row.get("videos_count"),
                    profile_url: row.get("profile_url"),
                });
                WatchlistEntry { account, latest }
            })
            .collect();

        Ok(entries)
    }

    #[instrument(skip(self))]
    async fn latest_snapshot(&self, handle: &str) -> StorageResult<Option<SnapshotRow>> {
        let row = sqlx::query(
            r#"
            SELECT id, handle, checked_at, nickname, bio, verified,
                   followers, following, likes, videos_count, profile_url
            FROM snapshots
            WHERE handle = ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(Self::row_to_snapshot))
    }

    #[instrument(skip(self, profile), fields(handle = %profile.username))]
    async fn save_snapshot(&self, profile: &ProfileSnapshot) -> StorageResult<SnapshotRow> {
        let checked_at = Utc::now();
        let checked_at_millis = Self::timestamp_to_millis(&checked_at);

        // Snapshot insert and account bookkeeping are one atomic unit.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO watch_accounts (handle, created_at, active)
            VALUES (?, ?, 1)
            ON CONFLICT (handle) DO NOTHING
            "#,
        )
        .bind(&profile.username)
        .bind(checked_at_millis)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            r#"
            INSERT INTO snapshots (
                handle, checked_at, nickname, bio, verified,
                followers, following, likes, videos_count, profile_url
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.username)
        .bind(checked_at_millis)
        .bind(&profile.nickname)
        .bind(&profile.bio)
        .bind(if profile.verified { 1i64 } else { 0i64 })
        .bind(profile.followers)
        .bind(profile.following)
        .bind(profile.likes)
        .bind(profile.videos_count)
        .bind(&profile.profile_url)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE watch_accounts
            SET last_checked_at = ?, last_error = NULL
            WHERE handle = ?
            "#,
        )
        .bind(checked_at_millis)
        .bind(&profile.username)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("snapshot persisted for {}", profile.username);

        Ok(SnapshotRow {
            id: result.last_insert_rowid(),
            handle: profile.username.clone(),
            checked_at,
            nickname: profile.nickname.clone(),
            bio: profile.bio.clone(),
            verified: profile.verified,
            followers: profile.followers,
            following: profile.following,
            likes: profile.likes,
            videos_count: profile.videos_count,
            profile_url: profile.profile_url.clone(),
        })
    }

    #[instrument(skip(self))]
    async fn snapshot_history(
        &self,
        handle: &str,
        limit: usize,
    ) -> StorageResult<Vec<SnapshotRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, handle, checked_at, nickname, bio, verified,
                   followers, following, likes, videos_count, profile_url
            FROM snapshots
            WHERE handle = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(handle)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_snapshot).collect())
    }

    #[instrument(skip(self, events), fields(count = events.len()))]
    async fn record_events(&self, handle: &str, events: &[ChangeEvent]) -> StorageResult<()> {
        if events.is_empty() {
            return Ok(());
        }

        let detected_at = Self::timestamp_to_millis(&Utc::now());

        let mut tx = self.pool.begin().await?;

        for event in events {
            sqlx::query(
                r#"
                INSERT INTO events (
                    handle, detected_at, metric, old_value, new_value, delta, message
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(handle)
            .bind(detected_at)
            .bind(event.metric.as_str())
            .bind(&event.old_value)
            .bind(&event.new_value)
            .bind(event.delta)
            .bind(&event.message)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        debug!("recorded {} events for {}", events.len(), handle);
        Ok(())
    }

    #[instrument(skip(self, error))]
    async fn record_failure(&self, handle: &str, error: &str) -> StorageResult<()> {
        let checked_at = Self::timestamp_to_millis(&Utc::now());

        // Failure insert and account bookkeeping are one atomic unit.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO watch_accounts (handle, created_at, active)
            VALUES (?, ?, 1)
            ON CONFLICT (handle) DO NOTHING
            "#,
        )
        .bind(handle)
        .bind(checked_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO failures (handle, checked_at, error) VALUES (?, ?, ?)")
            .bind(handle)
            .bind(checked_at)
            .bind(error)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE watch_accounts
            SET last_checked_at = ?, last_error = ?
            WHERE handle = ?
            "#,
        )
        .bind(checked_at)
        .bind(error)
        .bind(handle)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("failure recorded for {}: {}", handle, error);
        Ok(())
    }

    async fn recent_events(&self, limit: usize) -> StorageResult<Vec<EventRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, handle, detected_at, metric, old_value, new_value, delta, message
            FROM events
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EventRow {
                id: row.get("id"),
                handle: row.get("handle"),
                detected_at: Self::millis_to_timestamp(row.get("detected_at")),
                metric: row.get("metric"),
                old_value: row.get("old_value"),
                new_value: row.get("new_value"),
                delta: row.get("delta"),
                message: row.get("message"),
            })
            .collect())
    }

    async fn recent_failures(&self, limit: usize) -> StorageResult<Vec<FailureRow>> {
        let rows = sqlx::query(
            r#"
            SELECT id, handle, checked_at, error
            FROM failures
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| FailureRow {
                id: row.get("id"),
                handle: row.get("handle"),
                checked_at: Self::millis_to_timestamp(row.get("checked_at")),
                error: row.get("error"),
            })
            .collect())
    }

    async fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        let now = Self::timestamp_to_millis(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn all_settings(&self) -> StorageResult<Vec<(String, String)>> {
        let rows = sqlx::query("SELECT key, value FROM settings ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("key"), row.get("value")))
            .collect())
    }

    #[instrument(skip(self))]
    async fn clear_all(&self) -> StorageResult<()> {
        info!("clearing all monitor data");

        let mut tx = self.pool.begin().await?;

        for table in ["events", "failures", "snapshots", "watch_accounts"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite store operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn stats(&self) -> StorageResult<String> {
        let accounts: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM watch_accounts")
            .fetch_one(&self.pool)
            .await?;
        let snapshots: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&self.pool)
            .await?;
        let events: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;
        let failures: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM failures")
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);
        let file_size_mb = file_size as f64 / 1_000_000.0;

        Ok(format!(
            "SQLite: {} accounts, {} snapshots, {} events, {} failures, {:.2} MB on disk",
            accounts.0, snapshots.0, events.0, failures.0, file_size_mb
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}
