use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::config::DetailConfig;
use crate::dashboard::state::SharedState;
use crate::data::api::{ApiResult, CurrentSignal, DashboardApi, ExpectedMove};
use crate::data::types::{ForecastDetail, HistoryPoint};

/// What one orchestration fetched, whether or not it was still current.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailResult {
    pub history: Vec<HistoryPoint>,
    pub forecast: Option<ForecastDetail>,
}

/// Loads the chart series and forecast for one selected symbol.
#[derive(Debug, Clone)]
pub struct DetailOrchestrator {
    timeframe: String,
}

impl DetailOrchestrator {
    pub fn new(timeframe: impl Into<String>) -> Self {
        Self {
            timeframe: timeframe.into(),
        }
    }

    pub fn from_config(config: &DetailConfig) -> Self {
        Self::new(config.history_timeframe.clone())
    }

    /// Runs the orchestration for selection `generation`, publishing the
    /// history as soon as it arrives. Writes for a superseded selection are
    /// dropped on arrival.
    pub async fn run(
        &self,
        api: Arc<dyn DashboardApi>,
        state: SharedState,
        symbol: String,
        generation: u64,
    ) -> DetailResult {
        let history = self.fetch_history(api.as_ref(), &symbol).await;
        let points = history.len();
        if !state.write().await.apply_history(generation, history.clone()) {
            debug!(%symbol, generation, "Dropped history for stale selection");
        } else {
            debug!(%symbol, points, "History published");
        }

        let forecast = fetch_forecast(api.as_ref(), &symbol).await;
        let complete = forecast.is_some();
        if state.write().await.finish_detail(generation, forecast.clone()) {
            info!(%symbol, forecast = complete, "Detail loaded");
        } else {
            debug!(%symbol, generation, "Dropped forecast for stale selection");
        }

        DetailResult { history, forecast }
    }

    /// Best effort: any failure leaves the chart empty.
    async fn fetch_history(&self, api: &dyn DashboardApi, symbol: &str) -> Vec<HistoryPoint> {
        match api.historical(symbol, &self.timeframe).await {
            Ok(points) => points,
            Err(e) => {
                warn!(%symbol, error = %e, "Historical fetch failed");
                Vec::new()
            }
        }
    }
}

async fn fetch_forecast(api: &dyn DashboardApi, symbol: &str) -> Option<ForecastDetail> {
    let (strategy, signal, expected_move, price) = futures::join!(
        api.best_strategy(symbol),
        api.current_signal(symbol),
        api.expected_move(symbol),
        api.live_price(symbol),
    );
    assemble_forecast(symbol, strategy, signal, expected_move, price)
}

/// All-or-nothing: a single failed input yields no forecast at all.
pub fn assemble_forecast(
    symbol: &str,
    strategy: ApiResult<String>,
    signal: ApiResult<CurrentSignal>,
    expected_move: ApiResult<ExpectedMove>,
    price: ApiResult<f64>,
) -> Option<ForecastDetail> {
    match (strategy, signal, expected_move, price) {
        (Ok(strategy), Ok(signal), Ok(expected_move), Ok(price)) => Some(ForecastDetail {
            strategy,
            bias: signal.signal,
            confidence: signal.confidence,
            volatility_atr: signal.volatility_atr,
            expected_range: expected_move.range,
            invalidation_point: expected_move.invalidation,
            price,
        }),
        (strategy, signal, expected_move, price) => {
            let failures = [
                strategy.err(),
                signal.err(),
                expected_move.err(),
                price.err(),
            ];
            for e in failures.iter().flatten() {
                warn!(%symbol, error = %e, "Forecast input failed");
            }
            None
        }
    }
}
