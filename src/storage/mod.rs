//! Durable store for accounts, snapshots, events, failures and settings
//!
//! ## Design
//!
//! - **Trait-based**: `MonitorStore` allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio
//! - **Atomic writes**: Multi-statement writes run in one transaction so
//!   snapshot/failure rows and account bookkeeping never drift apart
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, one hub process

pub mod backend;
pub mod error;
pub mod schema;
pub mod sqlite;

pub use backend::MonitorStore;
pub use error::{StorageError, StorageResult};
pub use schema::{AccountRow, EventRow, FailureRow, SnapshotRow, WatchlistEntry};
