use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};
use crate::config::BootstrapConfig;
use crate::data::api::DashboardApi;
use crate::data::types::Symbol;

/// Fetches the symbol registry at startup with a fixed-delay retry budget.
#[derive(Debug, Clone)]
pub struct InitRetrier {
    max_retries: u32,
    delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapOutcome {
    pub registry: Vec<Symbol>,
    pub attempts: u32,
    pub exhausted: bool,
}

impl InitRetrier {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            delay,
        }
    }

    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }

    /// `max_retries` is the whole attempt budget: with the default of 3, three
    /// consecutive failures end the bootstrap. Exhaustion is not an error; the
    /// caller gets an empty registry and renders the "no tickers" state.
    pub async fn bootstrap(&self, api: &dyn DashboardApi) -> BootstrapOutcome {
        let mut attempts = 0;

        loop {
            attempts += 1;
            match api.list_symbols().await {
                Ok(registry) => {
                    info!(attempts, symbols = registry.len(), "Symbol registry loaded");
                    return BootstrapOutcome {
                        registry,
                        attempts,
                        exhausted: false,
                    };
                }
                Err(e) if attempts < self.max_retries => {
                    warn!(
                        error = %e,
                        "Init failed, retrying in {:?} ({} left)",
                        self.delay,
                        self.max_retries - attempts
                    );
                    sleep(self.delay).await;
                }
                Err(e) => {
                    error!(error = %e, attempts, "Initialization failed permanently");
                    return BootstrapOutcome {
                        registry: Vec::new(),
                        attempts,
                        exhausted: true,
                    };
                }
            }
        }
    }
}
