use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;
use crate::data::types::{
    ExpectedRange, HistoryPoint, Region, Signal, SignalKind, Snapshot, Symbol, SystemMetrics,
    TickerState,
};

const LIST_SYMBOLS: &str = "list symbols";
const BULK_STATE: &str = "bulk state";
const SYSTEM_METRICS: &str = "system metrics";
const ADD_SYMBOLS: &str = "add symbols";
const AUTO_DISCOVER: &str = "auto-discover";
const HISTORICAL: &str = "historical series";
const BEST_STRATEGY: &str = "best strategy";
const CURRENT_SIGNAL: &str = "current signal";
const EXPECTED_MOVE: &str = "expected move";
const LIVE_PRICE: &str = "live price";
const ENGINE_FOCUS: &str = "engine focus";
const ENGINE_MODE: &str = "engine mode";
const HEALTH: &str = "health";

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "Datetime", "Date", "date", "time", "index"];
const CLOSE_KEYS: &[&str] = &["Close", "close"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{endpoint}: transport error: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: backend returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint}: malformed response: {reason}")]
    Malformed { endpoint: &'static str, reason: String },
}

impl ApiError {
    fn malformed(endpoint: &'static str, reason: impl Into<String>) -> Self {
        ApiError::Malformed {
            endpoint,
            reason: reason.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Injected connection settings; replaces any ambient base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentSignal {
    pub signal: SignalKind,
    pub confidence: f64,
    pub volatility_atr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedMove {
    pub range: ExpectedRange,
    pub invalidation: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscoveryResponse {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

impl DiscoveryResponse {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Backend prioritisation hint sent when the signal filter changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    HighFrequency,
    Normal,
}

impl EngineMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineMode::HighFrequency => "high_frequency",
            EngineMode::Normal => "normal",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            EngineMode::HighFrequency => "bullish_filter",
            EngineMode::Normal => "filter_reset",
        }
    }
}

/// The fixed set of backend calls the dashboard depends on.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_symbols(&self) -> ApiResult<Vec<Symbol>>;
    async fn bulk_states(&self) -> ApiResult<Snapshot>;
    async fn system_metrics(&self) -> ApiResult<SystemMetrics>;
    async fn add_symbols(&self, symbols: &[Symbol]) -> ApiResult<()>;
    async fn auto_discover(&self) -> ApiResult<DiscoveryResponse>;
    async fn historical(&self, symbol: &str, timeframe: &str) -> ApiResult<Vec<HistoryPoint>>;
    async fn best_strategy(&self, symbol: &str) -> ApiResult<String>;
    async fn current_signal(&self, symbol: &str) -> ApiResult<CurrentSignal>;
    async fn expected_move(&self, symbol: &str) -> ApiResult<ExpectedMove>;
    async fn live_price(&self, symbol: &str) -> ApiResult<f64>;
    async fn set_engine_focus(&self, region: Region) -> ApiResult<()>;
    async fn set_engine_mode(&self, mode: EngineMode) -> ApiResult<()>;
    async fn health(&self) -> ApiResult<HealthStatus>;
}

/// Entries are kept loose so one bad ticker cannot sink the whole poll.
#[derive(Debug, Deserialize)]
struct WireTickerState {
    #[serde(default)]
    last_price: Option<Value>,
    #[serde(default)]
    last_signal: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WireSignal {
    signal: SignalKind,
    confidence: f64,
    #[serde(default)]
    strategy: String,
}

#[derive(Debug, Deserialize)]
struct WireCurrentSignal {
    signal: SignalKind,
    confidence: f64,
    #[serde(default)]
    volatility_atr: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WireExpectedMove {
    range: ExpectedRange,
    invalidation: f64,
}

#[derive(Debug, Deserialize)]
struct WireBestStrategy {
    best_strategy: String,
}

#[derive(Debug, Deserialize)]
struct WireLivePrice {
    price: f64,
}

#[derive(Debug, Serialize)]
struct FocusRequest<'a> {
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct ModeRequest<'a> {
    mode: &'a str,
    reason: &'a str,
}

pub struct BackendClient {
    client: Client,
    config: ClientConfig,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &'static str, path: &str) -> ApiResult<T> {
        let response = self.client
            .get(self.url(path))
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        decode(endpoint, response).await
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &'static str,
        path: &str,
        body: &B,
    ) -> ApiResult<Response> {
        let response = self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint, source })?;

        ensure_success(endpoint, response)
    }
}

fn ensure_success(endpoint: &'static str, response: Response) -> ApiResult<Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            endpoint,
            status: status.as_u16(),
        });
    }
    Ok(response)
}

async fn decode<T: DeserializeOwned>(endpoint: &'static str, response: Response) -> ApiResult<T> {
    let response = ensure_success(endpoint, response)?;
    let body = response
        .text()
        .await
        .map_err(|source| ApiError::Transport { endpoint, source })?;

    serde_json::from_str(&body).map_err(|e| ApiError::malformed(endpoint, e.to_string()))
}

#[async_trait]
impl DashboardApi for BackendClient {
    async fn list_symbols(&self) -> ApiResult<Vec<Symbol>> {
        self.get_json(LIST_SYMBOLS, "/tickers").await
    }

    async fn bulk_states(&self) -> ApiResult<Snapshot> {
        let wire: HashMap<Symbol, Value> = self.get_json(BULK_STATE, "/states").await?;
        Ok(convert_states(wire))
    }

    async fn system_metrics(&self) -> ApiResult<SystemMetrics> {
        let metrics: SystemMetrics = self.get_json(SYSTEM_METRICS, "/system-metrics").await?;
        check_finite(SYSTEM_METRICS, "data_processed_mb", metrics.data_processed_mb)?;
        check_finite(SYSTEM_METRICS, "uptime_seconds", metrics.uptime_seconds)?;
        Ok(metrics)
    }

    async fn add_symbols(&self, symbols: &[Symbol]) -> ApiResult<()> {
        self.post_json(ADD_SYMBOLS, "/tickers/add", symbols).await?;
        Ok(())
    }

    async fn auto_discover(&self) -> ApiResult<DiscoveryResponse> {
        let response = self.client
            .post(self.url("/tickers/enhance"))
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint: AUTO_DISCOVER, source })?;

        decode(AUTO_DISCOVER, response).await
    }

    async fn historical(&self, symbol: &str, timeframe: &str) -> ApiResult<Vec<HistoryPoint>> {
        let response = self.client
            .get(self.url(&format!("/historical/{}", symbol)))
            .query(&[("timeframe", timeframe)])
            .send()
            .await
            .map_err(|source| ApiError::Transport { endpoint: HISTORICAL, source })?;

        let rows: Vec<Value> = decode(HISTORICAL, response).await?;
        Ok(convert_history(rows))
    }

    async fn best_strategy(&self, symbol: &str) -> ApiResult<String> {
        let wire: WireBestStrategy = self
            .get_json(BEST_STRATEGY, &format!("/best-strategy/{}", symbol))
            .await?;
        Ok(wire.best_strategy)
    }

    async fn current_signal(&self, symbol: &str) -> ApiResult<CurrentSignal> {
        let wire: WireCurrentSignal = self
            .get_json(CURRENT_SIGNAL, &format!("/current-signal/{}", symbol))
            .await?;
        convert_current_signal(wire)
    }

    async fn expected_move(&self, symbol: &str) -> ApiResult<ExpectedMove> {
        let wire: WireExpectedMove = self
            .get_json(EXPECTED_MOVE, &format!("/expected-move/{}", symbol))
            .await?;
        convert_expected_move(wire)
    }

    async fn live_price(&self, symbol: &str) -> ApiResult<f64> {
        let wire: WireLivePrice = self
            .get_json(LIVE_PRICE, &format!("/live-price/{}", symbol))
            .await?;
        check_finite(LIVE_PRICE, "price", wire.price)?;
        Ok(wire.price)
    }

    async fn set_engine_focus(&self, region: Region) -> ApiResult<()> {
        let body = FocusRequest { region: region.as_str() };
        self.post_json(ENGINE_FOCUS, "/engine/focus", &body).await?;
        Ok(())
    }

    async fn set_engine_mode(&self, mode: EngineMode) -> ApiResult<()> {
        let body = ModeRequest {
            mode: mode.as_str(),
            reason: mode.reason(),
        };
        self.post_json(ENGINE_MODE, "/engine/mode", &body).await?;
        Ok(())
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.get_json(HEALTH, "/health").await
    }
}

fn check_finite(endpoint: &'static str, field: &str, value: f64) -> ApiResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ApiError::malformed(endpoint, format!("{} is not finite", field)))
    }
}

fn check_confidence(endpoint: &'static str, confidence: f64) -> ApiResult<()> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(())
    } else {
        Err(ApiError::malformed(
            endpoint,
            format!("confidence {} outside 0..1", confidence),
        ))
    }
}

/// Per-entry validation: an invalid field is dropped from its own ticker and
/// logged, the rest of the snapshot still lands.
fn convert_states(wire: HashMap<Symbol, Value>) -> Snapshot {
    wire.into_iter()
        .map(|(symbol, entry)| {
            let state = convert_ticker(&symbol, entry);
            (symbol, state)
        })
        .collect()
}

fn convert_ticker(symbol: &str, entry: Value) -> TickerState {
    let wire: WireTickerState = match serde_json::from_value(entry) {
        Ok(wire) => wire,
        Err(e) => {
            warn!(%symbol, error = %e, "Ignoring malformed bulk state entry");
            return TickerState::default();
        }
    };

    let price = match wire.last_price {
        None => None,
        Some(value) => match value.as_f64().filter(|p| p.is_finite()) {
            Some(price) => Some(price),
            None => {
                warn!(%symbol, value = %value, "Ignoring invalid last_price");
                None
            }
        },
    };

    let signal = wire.last_signal.and_then(|value| match convert_signal(value) {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!(%symbol, error = %e, "Ignoring invalid last_signal");
            None
        }
    });

    TickerState { price, signal }
}

fn convert_signal(value: Value) -> ApiResult<Signal> {
    let wire: WireSignal = serde_json::from_value(value)
        .map_err(|e| ApiError::malformed(BULK_STATE, e.to_string()))?;
    check_confidence(BULK_STATE, wire.confidence)?;

    Ok(Signal {
        kind: wire.signal,
        confidence: wire.confidence,
        strategy: wire.strategy,
    })
}

fn convert_current_signal(wire: WireCurrentSignal) -> ApiResult<CurrentSignal> {
    check_confidence(CURRENT_SIGNAL, wire.confidence)?;
    let volatility_atr = wire.volatility_atr.unwrap_or(0.0);
    check_finite(CURRENT_SIGNAL, "volatility_atr", volatility_atr)?;

    Ok(CurrentSignal {
        signal: wire.signal,
        confidence: wire.confidence,
        volatility_atr,
    })
}

fn convert_expected_move(wire: WireExpectedMove) -> ApiResult<ExpectedMove> {
    check_finite(EXPECTED_MOVE, "range.min", wire.range.min)?;
    check_finite(EXPECTED_MOVE, "range.max", wire.range.max)?;
    check_finite(EXPECTED_MOVE, "invalidation", wire.invalidation)?;
    if wire.range.min > wire.range.max {
        return Err(ApiError::malformed(
            EXPECTED_MOVE,
            format!("range min {} above max {}", wire.range.min, wire.range.max),
        ));
    }

    Ok(ExpectedMove {
        range: wire.range,
        invalidation: wire.invalidation,
    })
}

/// Keeps only rows with a readable timestamp and a finite close.
fn convert_history(rows: Vec<Value>) -> Vec<HistoryPoint> {
    rows.iter()
        .filter_map(|row| {
            let timestamp = TIMESTAMP_KEYS
                .iter()
                .find_map(|key| row.get(*key).and_then(parse_timestamp))?;
            let close = CLOSE_KEYS
                .iter()
                .find_map(|key| row.get(*key).and_then(Value::as_f64))
                .filter(|c| c.is_finite())?;
            Some(HistoryPoint { timestamp, close })
        })
        .collect()
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        }
        _ => None,
    }
}
