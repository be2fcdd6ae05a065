//! Failure handling: every failed check leaves a durable trace

use std::sync::Arc;

use pretty_assertions::assert_eq;

use iris_monitor::fetcher::ScrapeError;
use iris_monitor::monitor::{CycleOutcome, CycleSummary};
use iris_monitor::storage::MonitorStore;

use crate::helpers::{ScriptedFetcher, open_store, profile, service_with};

#[tokio::test]
async fn test_failed_check_records_failure_and_no_snapshot() {
    let (_guard, store) = open_store().await;
    store.add_account("bob").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("bob", Err(ScrapeError::PayloadMissing));
    let service = service_with(Arc::clone(&store), fetcher);

    let outcome = service.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            accounts: 1,
            checked: 0,
            failed: 1,
        })
    );

    assert!(store.latest_snapshot("bob").await.unwrap().is_none());

    let failures = store.recent_failures(10).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].handle, "bob");
    assert_eq!(failures[0].error, "Could not read profile payload from page.");

    let accounts = store.list_active_accounts().await.unwrap();
    assert_eq!(
        accounts[0].last_error.as_deref(),
        Some("Could not read profile payload from page.")
    );
}

#[tokio::test]
async fn test_one_failing_account_does_not_block_the_rest() {
    let (_guard, store) = open_store().await;
    store.add_account("alice").await.unwrap();
    store.add_account("bob").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push_ok("alice", profile("alice", 100));
    fetcher.push("bob", Err(ScrapeError::AccountMissing));
    let service = service_with(Arc::clone(&store), fetcher);

    let outcome = service.run_once().await;
    assert_eq!(
        outcome,
        CycleOutcome::Completed(CycleSummary {
            accounts: 2,
            checked: 1,
            failed: 1,
        })
    );

    assert!(store.latest_snapshot("alice").await.unwrap().is_some());
    assert!(store.latest_snapshot("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_recovery_clears_last_error() {
    let (_guard, store) = open_store().await;
    store.add_account("bob").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("bob", Err(ScrapeError::PayloadMissing));
    fetcher.push_ok("bob", profile("bob", 42));
    let service = service_with(Arc::clone(&store), fetcher);

    service.run_once().await;
    let accounts = store.list_active_accounts().await.unwrap();
    assert!(accounts[0].last_error.is_some());

    service.run_once().await;
    let accounts = store.list_active_accounts().await.unwrap();
    assert!(accounts[0].last_error.is_none());
    assert!(store.latest_snapshot("bob").await.unwrap().is_some());

    // The failure record itself is permanent history.
    assert_eq!(store.recent_failures(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_on_demand_check_of_unknown_handle_registers_it() {
    let (_guard, store) = open_store().await;

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.push("ghost", Err(ScrapeError::AccountMissing));
    let service = service_with(Arc::clone(&store), fetcher);

    assert!(!service.check_account("ghost").await);

    // Recording the failure implicitly registered the account.
    let failures = store.recent_failures(10).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].handle, "ghost");

    let accounts = store.list_active_accounts().await.unwrap();
    assert!(accounts.iter().any(|a| a.handle == "ghost"));
}
