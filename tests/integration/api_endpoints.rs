//! HTTP surface tests against a live server on an ephemeral port

use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

use iris_monitor::api::{ApiConfig, spawn_api_server, state::ApiState};
use iris_monitor::monitor::MonitorService;
use iris_monitor::settings::Settings;
use iris_monitor::storage::MonitorStore;
use iris_monitor::storage::sqlite::SqliteStore;

use crate::helpers::{ScriptedFetcher, profile};

struct TestApp {
    _guard: TempDir,
    base_url: String,
    store: Arc<SqliteStore>,
    fetcher: Arc<ScriptedFetcher>,
    monitor: Arc<MonitorService>,
}

async fn spawn_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(
        SqliteStore::new(temp_dir.path().join("api.db"))
            .await
            .unwrap(),
    );
    let fetcher = Arc::new(ScriptedFetcher::new());
    let monitor = Arc::new(MonitorService::new(
        Arc::clone(&store) as _,
        Arc::clone(&fetcher) as _,
        3600,
    ));

    let state = ApiState::new(
        Arc::clone(&store) as _,
        Arc::clone(&monitor),
        Settings::from_env(),
    );
    let config = ApiConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        enable_cors: false,
    };
    let addr = spawn_api_server(config, state).await.unwrap();

    TestApp {
        _guard: temp_dir,
        base_url: format!("http://{}/api/v1", addr),
        store,
        fetcher,
        monitor,
    }
}

#[tokio::test]
async fn test_health_endpoint_reports_healthy() {
    let app = spawn_app().await;

    let response = reqwest::get(format!("{}/health", app.base_url))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_watchlist_add_list_remove() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/watchlist", app.base_url))
        .json(&serde_json::json!({ "handle": "@Alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["handle"], "alice");
    assert_eq!(body["active"], true);

    let response = client
        .get(format!("{}/watchlist", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["watchlist"][0]["handle"], "alice");
    assert!(body["watchlist"][0]["latest"].is_null());

    let response = client
        .delete(format!("{}/watchlist/alice", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .get(format!("{}/watchlist", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_add_watch_rejects_invalid_handle() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .post(format!("{}/watchlist", app.base_url))
        .json(&serde_json::json!({ "handle": "not a handle!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_remove_unknown_handle_is_404() {
    let app = spawn_app().await;

    let response = reqwest::Client::new()
        .delete(format!("{}/watchlist/ghost", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_check_now_reports_outcome() {
    let app = spawn_app().await;
    app.fetcher.push_ok("alice", profile("alice", 100));

    let response = reqwest::Client::new()
        .post(format!("{}/watchlist/alice/check", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["handle"], "alice");
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn test_events_limit_is_validated() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/events?limit=0", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let response = client
        .get(format!("{}/events?limit=10", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_run_cycle_and_read_history() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    client
        .post(format!("{}/watchlist", app.base_url))
        .json(&serde_json::json!({ "handle": "alice" }))
        .send()
        .await
        .unwrap();
    app.fetcher.push_ok("alice", profile("alice", 100));
    app.fetcher.push_ok("alice", profile("alice", 150));

    for _ in 0..2 {
        let response = client
            .post(format!("{}/monitor/run", app.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    let response = client
        .get(format!("{}/accounts/alice/history", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 2);

    let response = client
        .get(format!("{}/events", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["events"][0]["metric"], "followers");
    assert_eq!(body["events"][0]["delta"], 50);
}

#[tokio::test]
async fn test_monitor_lifecycle_conflicts() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/monitor/stop", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = client
        .post(format!("{}/monitor/start", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("{}/monitor/start", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    let response = client
        .get(format!("{}/status", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["monitor"]["running"], true);

    let response = client
        .post(format!("{}/monitor/stop", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_reset_is_conflict_while_running() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    app.monitor.start();
    let response = client
        .post(format!("{}/reset", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    app.monitor.stop().await;

    app.store.add_account("alice").await.unwrap();
    let response = client
        .post(format!("{}/reset", app.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(app.store.list_active_accounts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_settings_update_applies_interval() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let mut updates = HashMap::new();
    updates.insert("monitor_interval_secs".to_string(), "60".to_string());

    let response = client
        .put(format!("{}/settings", app.base_url))
        .json(&updates)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["settings"]["monitor_interval_secs"], 60);
    assert_eq!(app.monitor.interval_secs(), 60);

    let response = client
        .get(format!("{}/settings", app.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["monitor_interval_secs"], 60);
}

#[tokio::test]
async fn test_settings_update_rejects_out_of_range() {
    let app = spawn_app().await;

    let mut updates = HashMap::new();
    updates.insert("monitor_interval_secs".to_string(), "5".to_string());

    let response = reqwest::Client::new()
        .put(format!("{}/settings", app.base_url))
        .json(&updates)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Monitor interval (seconds) must be between 30 and 86400."
    );
}
