pub mod state;

use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use crate::config::Config;
use crate::data::api::{ApiError, DashboardApi, EngineMode};
use crate::data::types::{Region, Symbol};
use crate::market::filter::SignalFilter;
use crate::sync::bootstrap::{BootstrapOutcome, InitRetrier};
use crate::sync::detail::{DetailOrchestrator, DetailResult};
use crate::sync::scheduler::StateSyncScheduler;
use crate::sync::session_watch::{self, SessionWatch};
use self::state::{DashboardState, RegistryTransition, SharedState};

/// Failures of user-initiated commands. Shown to the user, never retried.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Failed to ingest assets: {0}")]
    AddSymbols(#[source] ApiError),

    #[error("Discovery sequence failed: {0}")]
    Discovery(#[source] ApiError),

    #[error("Failed to reload symbol registry: {0}")]
    Reload(#[source] ApiError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    /// Backend reported success; the registry has been reloaded.
    Added { message: String },
    /// Backend answered but declined; registry untouched.
    Declined { message: String },
}

/// Owns the dashboard store and the tasks that feed it.
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    state: SharedState,
    retrier: InitRetrier,
    scheduler: StateSyncScheduler,
    session_watch: SessionWatch,
    detail: DetailOrchestrator,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>, config: &Config) -> Self {
        Self {
            api,
            state: DashboardState::shared(&config.view),
            retrier: InitRetrier::from_config(&config.bootstrap),
            scheduler: StateSyncScheduler::new(config.polling.state_interval()),
            session_watch: SessionWatch::new(config.polling.session_interval()),
            detail: DetailOrchestrator::from_config(&config.detail),
        }
    }

    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Start the session indicator and load the registry. Never fails: an
    /// exhausted bootstrap leaves an empty, non-loading dashboard.
    pub async fn init(&mut self) -> BootstrapOutcome {
        self.session_watch.start(self.state.clone());
        self.state.write().await.set_loading(true);

        let outcome = self.retrier.bootstrap(self.api.as_ref()).await;
        self.replace_registry(outcome.registry.clone()).await;
        self.state.write().await.set_loading(false);

        if outcome.registry.is_empty() {
            warn!("Dashboard has no tickers");
        }
        outcome
    }

    /// Swap the registry and keep the poll loop in step with it.
    pub async fn replace_registry(&mut self, symbols: Vec<Symbol>) -> RegistryTransition {
        let transition = self.state.write().await.replace_registry(symbols);

        match transition {
            RegistryTransition::BecameNonEmpty => {
                self.scheduler.start(self.api.clone(), self.state.clone());
            }
            RegistryTransition::BecameEmpty => self.scheduler.stop(),
            RegistryTransition::Replaced => self.scheduler.refresh_now(),
            RegistryTransition::StillEmpty => {}
        }
        transition
    }

    pub async fn reload_registry(&mut self) -> Result<RegistryTransition, CommandError> {
        let symbols = self.api.list_symbols().await.map_err(CommandError::Reload)?;
        Ok(self.replace_registry(symbols).await)
    }

    pub async fn select_region(&self, region: Region) {
        self.state.write().await.set_region(region);
        session_watch::refresh(&self.state, Utc::now()).await;

        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.set_engine_focus(region).await {
                warn!(%region, error = %e, "Engine focus notification failed");
            }
        });
    }

    pub async fn set_search(&self, search: &str) {
        self.state.write().await.set_search(search);
    }

    pub async fn set_signal_filter(&self, signal_filter: SignalFilter) {
        self.state.write().await.set_signal_filter(signal_filter);
        self.notify_engine_mode(signal_filter.engine_mode());
    }

    fn notify_engine_mode(&self, mode: EngineMode) {
        let api = self.api.clone();
        tokio::spawn(async move {
            if let Err(e) = api.set_engine_mode(mode).await {
                warn!(mode = mode.as_str(), error = %e, "Engine mode notification failed");
            }
        });
    }

    pub async fn visible_symbols(&self) -> Vec<Symbol> {
        self.state.read().await.visible_symbols()
    }

    /// Begin loading detail for `symbol`. Reselecting does not cancel the
    /// previous load; its late writes are discarded by generation.
    pub async fn select(&self, symbol: &str) -> JoinHandle<DetailResult> {
        let generation = self.state.write().await.select(symbol);
        info!(%symbol, generation, "Symbol selected");

        let detail = self.detail.clone();
        let api = self.api.clone();
        let state = self.state.clone();
        let symbol = symbol.to_string();
        tokio::spawn(async move { detail.run(api, state, symbol, generation).await })
    }

    pub async fn deselect(&self) {
        self.state.write().await.deselect();
    }

    /// Parse free-text input, submit it and reload the registry. Returns the
    /// number of symbols submitted; blank input sends nothing.
    pub async fn add_symbols(&mut self, input: &str) -> Result<usize, CommandError> {
        let symbols = parse_symbol_input(input);
        if symbols.is_empty() {
            return Ok(0);
        }

        self.api
            .add_symbols(&symbols)
            .await
            .map_err(CommandError::AddSymbols)?;
        info!(count = symbols.len(), "Symbols submitted");

        self.reload_registry().await?;
        Ok(symbols.len())
    }

    pub async fn auto_discover(&mut self) -> Result<DiscoveryOutcome, CommandError> {
        let response = self.api.auto_discover().await.map_err(CommandError::Discovery)?;

        if !response.is_success() {
            info!(status = %response.status, "Auto-discovery declined: {}", response.message);
            return Ok(DiscoveryOutcome::Declined { message: response.message });
        }

        self.reload_registry().await?;
        info!("Auto-discovery complete: {}", response.message);
        Ok(DiscoveryOutcome::Added { message: response.message })
    }

    /// Stop both timers, close the detail view and make every in-flight
    /// response stale.
    pub async fn shutdown(&mut self) {
        self.scheduler.stop();
        self.session_watch.stop();
        self.deselect().await;
        self.state.write().await.invalidate_in_flight();
        info!("Dashboard shut down");
    }
}

fn separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[\s,]+").expect("valid separator pattern"))
}

/// Split on whitespace/commas, trim, uppercase, drop empties.
pub fn parse_symbol_input(input: &str) -> Vec<Symbol> {
    separators()
        .split(input)
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
