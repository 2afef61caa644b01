mod cache;
mod config;
mod dashboard;
mod db;
mod engine;
mod provider;
mod tracker;

use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cache::PredictionCache;
use crate::config::Config;
use crate::dashboard::AppState;
use crate::db::{SqliteStore, Store};
use crate::provider::{HttpMetricsProvider, MetricsProvider};
use crate::tracker::OutcomeTracker;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    info!(
        "Starting gridcast: season {}, week {}, model '{}'",
        config.season, config.week, config.model_name
    );

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.database_path)?);
    let provider: Arc<dyn MetricsProvider> =
        Arc::new(HttpMetricsProvider::new(&config.metrics_api_url)?);

    let tracker = OutcomeTracker::new(
        store.clone(),
        &config.model_name,
        config.season,
        config.is_preseason(),
    );
    let cache = PredictionCache::new(
        store,
        provider.clone(),
        tracker.clone(),
        config.staleness(),
        config.inter_game_delay(),
    );

    // A dead feed at startup is not fatal: serve whatever is cached and
    // let the scheduler retry.
    match provider.schedule(config.week).await {
        Ok(games) => cache.initialize(&games, config.week).await?,
        Err(e) => warn!("Initial schedule fetch failed: {}", e),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(cache.clone().run_scheduler(
        config.week,
        config.regen_period(),
        shutdown_rx,
    ));

    let state = AppState {
        cache,
        tracker,
        week: config.week,
    };
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, dashboard::router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = scheduler.await;
    info!("Shutdown complete");
    Ok(())
}
