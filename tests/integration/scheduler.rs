//! Scheduler lifecycle: start, stop, interval, reset

use std::sync::Arc;

use iris_monitor::storage::MonitorStore;

use crate::helpers::{ScriptedFetcher, open_store, profile, service_with};

#[tokio::test]
async fn test_start_and_stop_are_idempotent_signals() {
    let (_guard, store) = open_store().await;
    let service = service_with(store, Arc::new(ScriptedFetcher::new()));

    assert!(!service.stop().await, "stop before start should be a no-op");

    assert!(service.start());
    assert!(service.is_running());
    assert!(!service.start(), "second start should report already running");

    assert!(service.stop().await);
    assert!(!service.is_running());
    assert!(!service.stop().await, "second stop should be a no-op");
}

#[tokio::test]
async fn test_loop_runs_a_cycle_immediately_on_start() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    let service = service_with(Arc::clone(&store), fetcher);

    service.start();

    // The first cycle starts right away; poll briefly for its result.
    let mut latest = None;
    for _ in 0..50 {
        latest = store.latest_snapshot("alice").await.unwrap();
        if latest.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(latest.is_some(), "first cycle should run without waiting an interval");

    service.stop().await;
}

#[tokio::test]
async fn test_restart_after_stop() {
    let (_guard, store) = open_store().await;
    let service = service_with(store, Arc::new(ScriptedFetcher::new()));

    assert!(service.start());
    assert!(service.stop().await);
    assert!(service.start(), "a stopped scheduler can be started again");
    assert!(service.stop().await);
}

#[tokio::test]
async fn test_reset_is_rejected_while_running() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();
    let service = service_with(Arc::clone(&store), Arc::new(ScriptedFetcher::new()));

    service.start();
    assert!(!service.reset_data().await.unwrap());

    // Rejection leaves the data alone.
    assert_eq!(store.list_active_accounts().await.unwrap().len(), 1);
    service.stop().await;
}

#[tokio::test]
async fn test_reset_clears_data_but_keeps_settings() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();
    store.set_setting("monitor_interval_secs", "60").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    let service = service_with(Arc::clone(&store), fetcher);
    service.run_once().await;

    assert!(service.reset_data().await.unwrap());

    assert!(store.list_active_accounts().await.unwrap().is_empty());
    assert!(store.latest_snapshot("alice").await.unwrap().is_none());
    assert!(store.recent_events(10).await.unwrap().is_empty());
    assert!(store.recent_failures(10).await.unwrap().is_empty());
    assert_eq!(
        store.get_setting("monitor_interval_secs").await.unwrap().as_deref(),
        Some("60")
    );
}

#[tokio::test]
async fn test_interval_update_applies_without_restart() {
    let (_guard, store) = open_store().await;
    let service = service_with(store, Arc::new(ScriptedFetcher::new()));

    service.start();
    service.set_interval(120);
    assert_eq!(service.status().interval_secs, 120);
    service.stop().await;
}
