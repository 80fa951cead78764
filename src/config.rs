use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use crate::data::api::ClientConfig;
use crate::data::types::Region;
use crate::market::filter::SignalFilter;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    #[serde(default)]
    pub detail: DetailConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub universe: UniverseConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_state_interval")]
    pub state_interval_secs: u64,
    #[serde(default = "default_session_interval")]
    pub session_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailConfig {
    #[serde(default = "default_timeframe")]
    pub history_timeframe: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_region")]
    pub region: Region,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub signal_filter: SignalFilter,
    #[serde(default)]
    pub watch_symbol: Option<String>,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

/// Commands run once after bootstrap.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniverseConfig {
    /// Free-text symbol list, split on whitespace and commas.
    #[serde(default)]
    pub add_symbols: String,
    #[serde(default)]
    pub auto_discover: bool,
}

fn default_state_interval() -> u64 { 15 }
fn default_session_interval() -> u64 { 60 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_delay() -> u64 { 2000 }
fn default_timeframe() -> String { "1h".to_string() }
fn default_region() -> Region { Region::Us }
fn default_report_interval() -> u64 { 30 }

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            state_interval_secs: default_state_interval(),
            session_interval_secs: default_session_interval(),
        }
    }
}

impl PollingConfig {
    pub fn state_interval(&self) -> Duration {
        Duration::from_secs(self.state_interval_secs.max(1))
    }

    pub fn session_interval(&self) -> Duration {
        Duration::from_secs(self.session_interval_secs.max(1))
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl Default for DetailConfig {
    fn default() -> Self {
        Self {
            history_timeframe: default_timeframe(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            search: String::new(),
            signal_filter: SignalFilter::All,
            watch_symbol: None,
            report_interval_secs: default_report_interval(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub api_url: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            api_url: std::env::var("DASHBOARD_API_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        })
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_url.clone())
    }
}
