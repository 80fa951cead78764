use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Opaque asset identifier as the backend reports it ("AAPL", "RELIANCE.NS", "BTC-USD").
pub type Symbol = String;

/// Per-symbol price/signal state, keyed by symbol and replaced wholesale on every poll.
pub type Snapshot = HashMap<Symbol, TickerState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Us,
    In,
    Crypto,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "US",
            Region::In => "IN",
            Region::Crypto => "CRYPTO",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "US" => Ok(Region::Us),
            "IN" => Ok(Region::In),
            "CRYPTO" => Ok(Region::Crypto),
            other => Err(format!("unknown region: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    MarketOpen,
    MarketClosed,
    Weekend,
    Live247,
    Unknown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::MarketOpen => "MARKET_OPEN",
            SessionState::MarketClosed => "MARKET_CLOSED",
            SessionState::Weekend => "WEEKEND",
            SessionState::Live247 => "LIVE_24/7",
            SessionState::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_open: bool,
    pub status: SessionState,
}

impl SessionStatus {
    pub const fn open(status: SessionState) -> Self {
        Self { is_open: true, status }
    }

    pub const fn closed(status: SessionState) -> Self {
        Self { is_open: false, status }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalKind::Bullish => "bullish",
            SignalKind::Bearish => "bearish",
            SignalKind::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    /// In `0.0..=1.0`, validated at the API boundary.
    pub confidence: f64,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TickerState {
    pub price: Option<f64>,
    pub signal: Option<Signal>,
}

/// Aggregate backend health counters, refreshed on the poll cadence.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SystemMetrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_tickers: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_tickers: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data_processed_mb: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uptime_seconds: f64,
    #[serde(default)]
    pub market_session: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_syncing: bool,
    #[serde(default)]
    pub last_error: Option<String>,
}

/// The backend serialises NaN/Inf as `null`; treat those like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ExpectedRange {
    pub min: f64,
    pub max: f64,
}

/// Multi-field analytic result for the selected symbol. Only ever built
/// from a complete set of auxiliary responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastDetail {
    pub strategy: String,
    pub bias: SignalKind,
    pub confidence: f64,
    pub volatility_atr: f64,
    pub expected_range: ExpectedRange,
    pub invalidation_point: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}
