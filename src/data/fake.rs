//! Scriptable in-memory backend used by the async component tests.
//! Responses are captured when a call is issued, before any simulated latency.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use crate::data::api::{
    ApiError, ApiResult, CurrentSignal, DashboardApi, DiscoveryResponse, EngineMode, ExpectedMove,
    HealthStatus,
};
use crate::data::types::{
    ExpectedRange, HistoryPoint, Region, SignalKind, Snapshot, Symbol, SystemMetrics,
};

fn failure(endpoint: &'static str) -> ApiError {
    ApiError::Status { endpoint, status: 500 }
}

#[derive(Default)]
pub struct FakeApi {
    pub symbols: Mutex<Vec<Symbol>>,
    /// Number of leading `list_symbols` calls that fail.
    pub list_failures: Mutex<u32>,
    pub states: Mutex<Option<Snapshot>>,
    pub metrics: Mutex<Option<SystemMetrics>>,
    pub history: Mutex<Option<Vec<HistoryPoint>>>,
    pub strategy: Mutex<Option<String>>,
    pub signal: Mutex<Option<CurrentSignal>>,
    pub expected_move: Mutex<Option<ExpectedMove>>,
    pub price: Mutex<Option<f64>>,
    pub add_fails: Mutex<bool>,
    pub discovery: Mutex<Option<DiscoveryResponse>>,
    /// Per-call delays keyed by `"<call>"` or `"<call>:<symbol>"`.
    pub delays: Mutex<HashMap<String, Duration>>,
    pub calls: Mutex<Vec<String>>,
    pub added: Mutex<Vec<Vec<Symbol>>>,
    pub engine: Mutex<Vec<String>>,
}

impl FakeApi {
    /// Backend where every call succeeds with plausible data.
    pub fn healthy(symbols: &[&str]) -> Self {
        let fake = Self::default();
        *fake.symbols.lock().unwrap() = symbols.iter().map(|s| s.to_string()).collect();
        *fake.states.lock().unwrap() = Some(Snapshot::new());
        *fake.metrics.lock().unwrap() = Some(SystemMetrics::default());
        *fake.history.lock().unwrap() = Some(Vec::new());
        *fake.strategy.lock().unwrap() = Some("ema_crossover".to_string());
        *fake.signal.lock().unwrap() = Some(CurrentSignal {
            signal: SignalKind::Bullish,
            confidence: 0.72,
            volatility_atr: 2.4,
        });
        *fake.expected_move.lock().unwrap() = Some(ExpectedMove {
            range: ExpectedRange { min: 180.0, max: 195.0 },
            invalidation: 176.5,
        });
        *fake.price.lock().unwrap() = Some(187.3);
        fake
    }

    pub fn set_delay(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn clear_delays(&self) {
        self.delays.lock().unwrap().clear();
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == call).count()
    }

    async fn record(&self, call: &str, symbol: Option<&str>) {
        self.calls.lock().unwrap().push(call.to_string());
        let keyed = symbol.map(|s| format!("{}:{}", call, s));
        let delay = {
            let delays = self.delays.lock().unwrap();
            keyed
                .and_then(|k| delays.get(&k).copied())
                .or_else(|| delays.get(call).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn list_symbols(&self) -> ApiResult<Vec<Symbol>> {
        self.record("list_symbols", None).await;
        let mut failures = self.list_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(failure("list symbols"));
        }
        Ok(self.symbols.lock().unwrap().clone())
    }

    async fn bulk_states(&self) -> ApiResult<Snapshot> {
        let states = self.states.lock().unwrap().clone();
        self.record("bulk_states", None).await;
        states.ok_or_else(|| failure("bulk state"))
    }

    async fn system_metrics(&self) -> ApiResult<SystemMetrics> {
        let metrics = self.metrics.lock().unwrap().clone();
        self.record("system_metrics", None).await;
        metrics.ok_or_else(|| failure("system metrics"))
    }

    async fn add_symbols(&self, symbols: &[Symbol]) -> ApiResult<()> {
        self.record("add_symbols", None).await;
        if *self.add_fails.lock().unwrap() {
            return Err(failure("add symbols"));
        }
        self.added.lock().unwrap().push(symbols.to_vec());
        self.symbols.lock().unwrap().extend(symbols.iter().cloned());
        Ok(())
    }

    async fn auto_discover(&self) -> ApiResult<DiscoveryResponse> {
        self.record("auto_discover", None).await;
        self.discovery.lock().unwrap().clone().ok_or_else(|| failure("auto-discover"))
    }

    async fn historical(&self, symbol: &str, _timeframe: &str) -> ApiResult<Vec<HistoryPoint>> {
        let history = self.history.lock().unwrap().clone();
        self.record("historical", Some(symbol)).await;
        history.ok_or_else(|| failure("historical series"))
    }

    async fn best_strategy(&self, symbol: &str) -> ApiResult<String> {
        let strategy = self.strategy.lock().unwrap().clone();
        self.record("best_strategy", Some(symbol)).await;
        strategy.ok_or_else(|| failure("best strategy"))
    }

    async fn current_signal(&self, symbol: &str) -> ApiResult<CurrentSignal> {
        let signal = self.signal.lock().unwrap().clone();
        self.record("current_signal", Some(symbol)).await;
        signal.ok_or_else(|| failure("current signal"))
    }

    async fn expected_move(&self, symbol: &str) -> ApiResult<ExpectedMove> {
        let expected_move = self.expected_move.lock().unwrap().clone();
        self.record("expected_move", Some(symbol)).await;
        expected_move.ok_or_else(|| failure("expected move"))
    }

    async fn live_price(&self, symbol: &str) -> ApiResult<f64> {
        let price = *self.price.lock().unwrap();
        self.record("live_price", Some(symbol)).await;
        price.ok_or_else(|| failure("live price"))
    }

    async fn set_engine_focus(&self, region: Region) -> ApiResult<()> {
        self.record("set_engine_focus", None).await;
        self.engine.lock().unwrap().push(format!("focus:{}", region));
        Ok(())
    }

    async fn set_engine_mode(&self, mode: EngineMode) -> ApiResult<()> {
        self.record("set_engine_mode", None).await;
        self.engine.lock().unwrap().push(format!("mode:{}", mode.as_str()));
        Ok(())
    }

    async fn health(&self) -> ApiResult<HealthStatus> {
        self.record("health", None).await;
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: None,
        })
    }
}
