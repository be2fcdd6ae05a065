//! Monitor scheduler
//!
//! [`MonitorService`] owns the periodic loop and the per-cycle guard. It is
//! constructed once at process start and shared behind an `Arc`; there is
//! no implicit global instance.
//!
//! ## Concurrency model
//!
//! - One background task drives the periodic loop; `start`/`stop` manage it.
//! - The cycle guard is a non-blocking try-lock: a `run_once` that loses the
//!   race returns [`CycleOutcome::Busy`] with zero side effects instead of
//!   queuing behind the in-flight cycle.
//! - Status reads go through a short sync critical section and never wait
//!   on a cycle.
//! - `check_account` bypasses the guard; on-demand single checks may race
//!   an in-flight cycle, which the store tolerates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::detect::detect;
use crate::fetcher::ProfileFetcher;
use crate::storage::{MonitorStore, StorageResult};

/// Bounded wait for the loop to observe a stop signal
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Aggregate counts for one completed cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// Accounts in the active set at cycle start
    pub accounts: usize,
    pub checked: usize,
    pub failed: usize,
}

/// Result of a `run_once` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle held the guard; nothing was attempted
    Busy,
    Completed(CycleSummary),
}

/// Point-in-time view of the scheduler, safe to read during a cycle
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub last_run_started_at: Option<DateTime<Utc>>,
    pub last_run_finished_at: Option<DateTime<Utc>>,
    pub last_run_summary: Option<CycleSummary>,
}

#[derive(Debug, Default)]
struct CycleRecord {
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    summary: Option<CycleSummary>,
}

struct Worker {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// The scheduling loop and per-account check orchestration
pub struct MonitorService {
    store: Arc<dyn MonitorStore>,
    fetcher: Arc<dyn ProfileFetcher>,

    /// Seconds between cycle end and the next cycle start; read every
    /// iteration so settings changes apply to the next wait
    interval_secs: AtomicU64,

    /// Single-flight guard; only ever acquired with `try_lock`
    cycle_guard: tokio::sync::Mutex<()>,

    worker: StdMutex<Option<Worker>>,
    last_cycle: RwLock<CycleRecord>,
}

impl MonitorService {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        fetcher: Arc<dyn ProfileFetcher>,
        interval_secs: u64,
    ) -> Self {
        Self {
            store,
            fetcher,
            interval_secs: AtomicU64::new(interval_secs),
            cycle_guard: tokio::sync::Mutex::new(()),
            worker: StdMutex::new(None),
            last_cycle: RwLock::new(CycleRecord::default()),
        }
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs.load(Ordering::Relaxed)
    }

    /// Update the interval; takes effect for the next scheduled wait
    pub fn set_interval(&self, secs: u64) {
        self.interval_secs.store(secs, Ordering::Relaxed);
        debug!("monitor interval set to {}s", secs);
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .expect("worker lock poisoned")
            .as_ref()
            .is_some_and(|w| !w.join.is_finished())
    }

    /// Start the periodic loop
    ///
    /// Returns `false` when the loop is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut worker = self.worker.lock().expect("worker lock poisoned");
        if worker.as_ref().is_some_and(|w| !w.join.is_finished()) {
            return false;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let service = Arc::clone(self);
        let join = tokio::spawn(async move { service.run_loop(stop_rx).await });

        *worker = Some(Worker { stop_tx, join });
        info!("periodic monitor started");
        true
    }

    /// Signal the loop to exit and wait (bounded) for it to do so
    ///
    /// Returns `false` when the loop is not running. An in-flight cycle
    /// completes uninterrupted; the stop takes effect before the next one.
    pub async fn stop(&self) -> bool {
        let worker = self.worker.lock().expect("worker lock poisoned").take();
        let Some(worker) = worker else {
            return false;
        };
        if worker.join.is_finished() {
            return false;
        }

        let _ = worker.stop_tx.send(true);

        match tokio::time::timeout(STOP_TIMEOUT, worker.join).await {
            Ok(Ok(())) => info!("periodic monitor stopped"),
            Ok(Err(e)) => error!("monitor loop task failed: {}", e),
            Err(_) => warn!(
                "monitor loop did not stop within {:?}; detaching",
                STOP_TIMEOUT
            ),
        }
        true
    }

    async fn run_loop(self: Arc<Self>, mut stop_rx: watch::Receiver<bool>) {
        debug!("monitor loop started");

        loop {
            match self.run_once().await {
                CycleOutcome::Completed(summary) => {
                    debug!(
                        "cycle complete: {}/{} checked, {} failed",
                        summary.checked, summary.accounts, summary.failed
                    );
                }
                // An on-demand cycle was already doing the work.
                CycleOutcome::Busy => debug!("cycle already in flight, skipping tick"),
            }

            let wait = Duration::from_secs(self.interval_secs());
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        debug!("monitor loop stopped");
    }

    /// Execute one full cycle over the active watchlist
    ///
    /// The active set is read once at cycle start; accounts added or
    /// removed mid-cycle do not affect the in-progress cycle.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> CycleOutcome {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            return CycleOutcome::Busy;
        };

        {
            let mut record = self.last_cycle.write().expect("cycle record lock poisoned");
            record.started_at = Some(Utc::now());
        }

        let accounts = match self.store.list_active_accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!("could not read active accounts: {}", e);
                Vec::new()
            }
        };

        let mut checked = 0;
        let mut failed = 0;
        for account in &accounts {
            if self.check_account(&account.handle).await {
                checked += 1;
            } else {
                failed += 1;
            }
        }

        let summary = CycleSummary {
            accounts: accounts.len(),
            checked,
            failed,
        };

        {
            let mut record = self.last_cycle.write().expect("cycle record lock poisoned");
            record.finished_at = Some(Utc::now());
            record.summary = Some(summary);
        }

        CycleOutcome::Completed(summary)
    }

    /// Check one account: fetch, persist, detect, record
    ///
    /// Never propagates an error; every failure mode ends up as a recorded
    /// failure (or at worst a log line when the store itself is down), so
    /// one bad account cannot kill the loop or block the rest of a cycle.
    #[instrument(skip(self))]
    pub async fn check_account(&self, handle: &str) -> bool {
        let previous = match self.store.latest_snapshot(handle).await {
            Ok(previous) => previous,
            Err(e) => return self.fail_check(handle, &format!("storage error: {}", e)).await,
        };

        let profile = match self.fetcher.fetch(handle).await {
            Ok(profile) => profile,
            Err(e) => return self.fail_check(handle, &e.to_string()).await,
        };

        // From here on everything is keyed to the canonical handle the
        // fetcher reported, which may differ in case from the input.
        if let Err(e) = self.store.save_snapshot(&profile).await {
            return self
                .fail_check(&profile.username, &format!("storage error: {}", e))
                .await;
        }

        let events = detect(previous.as_ref(), &profile);
        if !events.is_empty() {
            info!("{} change(s) detected for {}", events.len(), profile.username);
        }
        if let Err(e) = self.store.record_events(&profile.username, &events).await {
            return self
                .fail_check(&profile.username, &format!("storage error: {}", e))
                .await;
        }

        true
    }

    async fn fail_check(&self, handle: &str, error: &str) -> bool {
        warn!("check failed for {}: {}", handle, error);
        if let Err(e) = self.store.record_failure(handle, error).await {
            error!("could not record failure for {}: {}", handle, e);
        }
        false
    }

    /// Current state; never waits on an in-progress cycle
    pub fn status(&self) -> MonitorStatus {
        let record = self.last_cycle.read().expect("cycle record lock poisoned");
        MonitorStatus {
            running: self.is_running(),
            interval_secs: self.interval_secs(),
            last_run_started_at: record.started_at,
            last_run_finished_at: record.finished_at,
            last_run_summary: record.summary,
        }
    }

    /// Destructive reset of all monitor data
    ///
    /// Returns `Ok(false)` without touching the store while the scheduler
    /// is running; settings survive the reset either way.
    pub async fn reset_data(&self) -> StorageResult<bool> {
        if self.is_running() {
            return Ok(false);
        }
        self.store.clear_all().await?;
        info!("monitor data cleared");
        Ok(true)
    }
}
