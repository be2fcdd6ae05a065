//! End-to-end cycle behavior: fetch, persist, detect, summarize

use std::sync::Arc;

use pretty_assertions::assert_eq;

use iris_monitor::detect::Metric;
use iris_monitor::monitor::{CycleOutcome, CycleSummary};
use iris_monitor::storage::MonitorStore;

use crate::helpers::{ScriptedFetcher, open_store, profile, service_with};

#[tokio::test]
async fn test_first_check_records_baseline_without_events() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    let service = service_with(Arc::clone(&store), fetcher);

    let outcome = service.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            accounts: 1,
            checked: 1,
            failed: 0,
        })
    );

    let latest = store.latest_snapshot("alice").await.unwrap().unwrap();
    assert_eq!(latest.followers, Some(100));

    // A baseline observation is not a change.
    assert!(store.recent_events(10).await.unwrap().is_empty());

    let accounts = store.list_active_accounts().await.unwrap();
    assert!(accounts[0].last_checked_at.is_some());
    assert!(accounts[0].last_error.is_none());
}

#[tokio::test]
async fn test_second_check_detects_follower_change() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    fetcher.push_ok("alice", profile("alice", 150));
    let service = service_with(Arc::clone(&store), fetcher);

    service.run_once().await;
    service.run_once().await;

    let history = store.snapshot_history("alice", 10).await.unwrap();
    assert_eq!(history.len(), 2);

    let events = store.recent_events(10).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].metric, Metric::Followers.to_string());
    assert_eq!(events[0].old_value.as_deref(), Some("100"));
    assert_eq!(events[0].new_value.as_deref(), Some("150"));
    assert_eq!(events[0].delta, Some(50));
    assert_eq!(events[0].message, "followers changed from 100 to 150 (+50).");
}

#[tokio::test]
async fn test_unchanged_profile_produces_no_events() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    fetcher.push_ok("alice", profile("alice", 100));
    let service = service_with(Arc::clone(&store), fetcher);

    service.run_once().await;
    service.run_once().await;

    assert_eq!(store.snapshot_history("alice", 10).await.unwrap().len(), 2);
    assert!(store.recent_events(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cycle_covers_every_active_account() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();
    store.add_account("bob").await.unwrap();
    store.add_account("carol").await.unwrap();
    store.deactivate_account("carol").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    fetcher.push_ok("bob", profile("bob", 200));
    let service = service_with(Arc::clone(&store), fetcher);

    let outcome = service.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            accounts: 2,
            checked: 2,
            failed: 0,
        })
    );

    // The deactivated account was never fetched.
    assert!(store.latest_snapshot("carol").await.unwrap().is_none());
}

#[tokio::test]
async fn test_snapshot_is_keyed_to_canonical_username() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    // The source reports a differently-cased canonical handle.
    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("Alice", 100));
    let service = service_with(Arc::clone(&store), fetcher);

    assert!(service.check_account("alice").await);

    let latest = store.latest_snapshot("Alice").await.unwrap().unwrap();
    assert_eq!(latest.handle, "Alice");
}

#[tokio::test]
async fn test_status_reflects_last_cycle_summary() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    let service = service_with(store, fetcher);

    service.run_once().await;

    let status = service.status();
    assert!(!status.running);
    assert!(status.last_run_started_at.is_some());
    assert!(status.last_run_finished_at.is_some());
    assert_eq!(
        status.last_run_summary,
        Some(CycleSummary {
            accounts: 1,
            checked: 1,
            failed: 0,
        })
    );
}
