use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use iris_monitor::{
    api::{ApiConfig, ApiState, spawn_api_server},
    fetcher::HttpProfileFetcher,
    monitor::MonitorService,
    settings::Settings,
    storage::{MonitorStore, sqlite::SqliteStore},
};
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value = "./iris.db")]
    db: String,

    /// Bind address; the port falls back to the stored `app_port` setting
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("iris_monitor", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let store: Arc<dyn MonitorStore> = Arc::new(SqliteStore::new(&args.db).await?);
    let settings = Settings::load(store.as_ref()).await?;

    let fetcher = Arc::new(HttpProfileFetcher::new());
    let monitor = Arc::new(MonitorService::new(
        Arc::clone(&store),
        fetcher,
        settings.monitor_interval_secs,
    ));

    if settings.auto_start_monitor {
        monitor.start();
    }

    let bind_addr = args.bind.unwrap_or_else(|| {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), settings.app_port)
    });

    let state = ApiState::new(Arc::clone(&store), Arc::clone(&monitor), settings);
    let addr = spawn_api_server(
        ApiConfig {
            bind_addr,
            enable_cors: true,
        },
        state,
    )
    .await?;

    info!("iris hub up at http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    monitor.stop().await;
    store.close().await?;

    Ok(())
}
