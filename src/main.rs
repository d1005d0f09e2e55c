mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod monitor;
mod notify;
mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::latency::FetchLatency;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::{MemoryStore, SqliteStore, WatchStore};
use crate::error::Result;
use crate::fetcher::{http_client, BazaarSource, ItemMarketSource, TornCatalog};
use crate::monitor::{MonitorSettings, PriceMonitor};
use crate::notify::DiscordNotifier;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Store ---
    let store: Arc<dyn WatchStore> = if cfg.db_path == ":memory:" {
        warn!("DB_PATH=:memory:, watches will not survive a restart");
        MemoryStore::new()
    } else {
        let store = SqliteStore::connect(&cfg.db_path).await?;
        info!("Database ready at {}", cfg.db_path);
        Arc::new(store)
    };

    // --- Collaborators ---
    let client = http_client()?;
    if cfg.torn_api_key.is_none() {
        warn!("TORN_API_KEY not set: item market listings and catalog refresh are disabled");
    }
    let bazaar = Arc::new(BazaarSource::new(client.clone(), cfg.weav3r_api_url.clone()));
    let market = Arc::new(ItemMarketSource::new(
        client.clone(),
        cfg.torn_api_url.clone(),
        cfg.torn_api_key.clone(),
    ));
    let catalog = Arc::new(TornCatalog::new(
        client.clone(),
        cfg.torn_api_url.clone(),
        cfg.torn_api_key.clone(),
    ));
    let notifier = Arc::new(DiscordNotifier::new(
        client,
        cfg.discord_api_url.clone(),
        cfg.discord_token.clone(),
    ));

    let health = Arc::new(HealthState::new());
    let latency = Arc::new(FetchLatency::new());

    // --- Price monitor (background, every MONITOR_INTERVAL_SECS) ---
    let monitor = PriceMonitor::new(
        Arc::clone(&store),
        bazaar.clone(),
        market.clone(),
        notifier,
        MonitorSettings {
            tick: Duration::from_secs(cfg.monitor_interval_secs),
            rate_limit: Duration::from_secs(cfg.rate_limit_secs),
        },
        Arc::clone(&health),
        Arc::clone(&latency),
    );
    let monitor_handle = monitor.start();

    // --- HTTP command surface ---
    if cfg.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set: admin routes are disabled");
    }
    let shutdown = Arc::new(Notify::new());
    let api_state = ApiState {
        store,
        bazaar,
        market,
        catalog,
        health,
        latency,
        admin_token: cfg.admin_token.clone(),
        shutdown: Arc::clone(&shutdown),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await;

    info!("Shutting down");
    monitor_handle.stop().await;
    served?;

    Ok(())
}

/// Resolves on Ctrl-C or on `POST /admin/shutdown`.
async fn shutdown_signal(admin_request: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = admin_request.notified() => {}
    }
}
