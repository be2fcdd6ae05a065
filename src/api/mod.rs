//! JSON API for the monitor hub
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **ApiState** hands every handler the store, the scheduler and the
//!   current settings
//! - Every endpoint maps 1:1 to an engine operation; the engine itself
//!   never sees unvalidated handles or limits
//!
//! ## Endpoints
//!
//! - `GET  /api/v1/health` - Liveness + storage ping
//! - `GET  /api/v1/status` - Scheduler state, settings, storage stats
//! - `GET  /api/v1/watchlist` - Active accounts with latest snapshots
//! - `POST /api/v1/watchlist` - Add a handle
//! - `DELETE /api/v1/watchlist/{handle}` - Deactivate a handle
//! - `POST /api/v1/watchlist/{handle}/check` - On-demand single check
//! - `GET  /api/v1/events` - Recent change events
//! - `GET  /api/v1/failures` - Recent failed checks
//! - `GET  /api/v1/accounts/{handle}/history` - Snapshot history
//! - `POST /api/v1/monitor/run|start|stop` - Scheduler control
//! - `GET/PUT /api/v1/settings` - Runtime settings
//! - `POST /api/v1/reset` - Destructive data reset (scheduler must be stopped)

pub mod error;
pub mod routes;
pub mod state;
pub mod utils;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000")
    pub bind_addr: SocketAddr,

    /// Enable permissive CORS for external dashboards
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".parse().expect("invalid default bind addr"),
            enable_cors: true,
        }
    }
}

/// Build the router; exposed separately so tests can serve it directly
pub fn build_router(state: ApiState) -> Router {
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/status", get(routes::status::get_status))
        .route(
            "/api/v1/watchlist",
            get(routes::watchlist::list_watchlist).post(routes::watchlist::add_watch),
        )
        .route(
            "/api/v1/watchlist/:handle",
            axum::routing::delete(routes::watchlist::remove_watch),
        )
        .route(
            "/api/v1/watchlist/:handle/check",
            post(routes::watchlist::check_watch_now),
        )
        .route("/api/v1/events", get(routes::events::recent_events))
        .route("/api/v1/failures", get(routes::events::recent_failures))
        .route(
            "/api/v1/accounts/:handle/history",
            get(routes::history::snapshot_history),
        )
        .route("/api/v1/monitor/run", post(routes::monitor::run_now))
        .route("/api/v1/monitor/start", post(routes::monitor::start_monitor))
        .route("/api/v1/monitor/stop", post(routes::monitor::stop_monitor))
        .route(
            "/api/v1/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route("/api/v1/reset", post(routes::monitor::reset_data))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// Starts an Axum HTTP server in a background task and returns the bound
/// local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    use tower_http::cors::{Any, CorsLayer};

    info!("starting API server on {}", config.bind_addr);

    let mut app = build_router(state);

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
