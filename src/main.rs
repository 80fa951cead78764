mod config;
mod dashboard;
mod data;
mod market;
mod monitoring;
mod sync;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use config::{Config, EnvConfig};
use dashboard::Dashboard;
use data::api::{BackendClient, DashboardApi};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Market dashboard starting...");

    // Load configuration
    let config = Config::load("config.toml")?;
    let env_config = EnvConfig::load()?;

    tracing::info!("Backend: {}", env_config.api_url);
    tracing::info!("Poll interval: {}s", config.polling.state_interval_secs);
    tracing::info!("View: region={} filter={}", config.view.region, config.view.signal_filter);

    let client = BackendClient::new(env_config.client_config());
    match client.health().await {
        Ok(health) => tracing::info!("Backend health: {}", health.status),
        Err(e) => tracing::warn!("Backend health check failed: {}", e),
    }

    let api: Arc<dyn DashboardApi> = Arc::new(client);
    let mut dashboard = Dashboard::new(api, &config);
    let outcome = dashboard.init().await;
    tracing::info!(
        "Registry: {} symbols after {} attempt(s), polling={}",
        outcome.registry.len(),
        outcome.attempts,
        dashboard.is_polling()
    );

    // Startup universe commands
    if !config.universe.add_symbols.trim().is_empty() {
        match dashboard.add_symbols(&config.universe.add_symbols).await {
            Ok(count) => tracing::info!("Added {} symbols", count),
            Err(e) => tracing::error!("{}", e),
        }
    }
    if config.universe.auto_discover {
        match dashboard.auto_discover().await {
            Ok(outcome) => tracing::info!("Auto-discovery: {:?}", outcome),
            Err(e) => tracing::error!("{}", e),
        }
    }

    // Apply the configured view the same way a user selection would
    dashboard.select_region(config.view.region).await;
    dashboard.set_search(&config.view.search).await;
    dashboard.set_signal_filter(config.view.signal_filter).await;
    tracing::info!("Visible symbols: {:?}", dashboard.visible_symbols().await);

    if let Some(symbol) = &config.view.watch_symbol {
        let detail = dashboard.select(symbol).await.await?;
        if detail.forecast.is_none() {
            tracing::warn!("No forecast for {} ({} history points)", symbol, detail.history.len());
        }
    }

    let state = dashboard.state();
    let mut report = tokio::time::interval(Duration::from_secs(config.view.report_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = report.tick() => {
                monitoring::report::log_summary(&*state.read().await);
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    dashboard.shutdown().await;

    Ok(())
}
