use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};
use crate::dashboard::state::SharedState;
use crate::data::api::DashboardApi;

/// Periodic poller for the bulk ticker snapshot and the system metrics.
///
/// Runs only while the registry is non-empty; the dashboard drives
/// `start`/`stop` from registry transitions. Each tick fires two independent
/// fetches and never waits for the previous tick's requests.
pub struct StateSyncScheduler {
    interval: Duration,
    refresh: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl StateSyncScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            refresh: Arc::new(Notify::new()),
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// No-op when already running. The first tick fires immediately.
    pub fn start(&mut self, api: Arc<dyn DashboardApi>, state: SharedState) {
        if self.is_running() {
            return;
        }

        info!("Starting state sync every {:?}", self.interval);
        let interval = self.interval;
        let refresh = self.refresh.clone();

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut iteration = 0u64;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = refresh.notified() => {
                        ticker.reset();
                    }
                }

                iteration += 1;
                debug!(iteration, "State sync tick");
                tick(&api, &state);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("State sync stopped");
        }
    }

    /// Request an out-of-cadence tick; the regular cadence restarts from it.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }
}

impl Drop for StateSyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fire both fetches without waiting on either. The handles are only
/// returned so callers can observe completion; the poll loop drops them.
pub fn tick(api: &Arc<dyn DashboardApi>, state: &SharedState) -> (JoinHandle<()>, JoinHandle<()>) {
    let states = tokio::spawn(sync_states(api.clone(), state.clone()));
    let metrics = tokio::spawn(sync_metrics(api.clone(), state.clone()));
    (states, metrics)
}

async fn sync_states(api: Arc<dyn DashboardApi>, state: SharedState) {
    let ticket = state.write().await.issue_states_ticket();

    match api.bulk_states().await {
        Ok(snapshot) => {
            let symbols = snapshot.len();
            if state.write().await.apply_states(ticket, snapshot) {
                debug!(symbols, sequence = ticket.sequence, "Snapshot replaced");
            } else {
                debug!(sequence = ticket.sequence, "Discarded stale bulk state response");
            }
        }
        Err(e) => error!(error = %e, "Bulk fetch failed"),
    }
}

async fn sync_metrics(api: Arc<dyn DashboardApi>, state: SharedState) {
    let ticket = state.write().await.issue_metrics_ticket();

    match api.system_metrics().await {
        Ok(metrics) => {
            if !state.write().await.apply_metrics(ticket, metrics) {
                debug!(sequence = ticket.sequence, "Discarded stale metrics response");
            }
        }
        Err(e) => error!(error = %e, "Metrics fetch failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewConfig;
    use crate::dashboard::state::DashboardState;
    use crate::data::fake::FakeApi;
    use crate::data::types::{Snapshot, SystemMetrics, TickerState};

    fn priced(symbol: &str, price: f64) -> Snapshot {
        let mut snapshot = Snapshot::new();
        snapshot.insert(symbol.to_string(), TickerState { price: Some(price), signal: None });
        snapshot
    }

    async fn seeded_state(symbols: &[&str]) -> SharedState {
        let state = DashboardState::shared(&ViewConfig::default());
        state
            .write()
            .await
            .replace_registry(symbols.iter().map(|s| s.to_string()).collect());
        state
    }

    #[tokio::test]
    async fn test_tick_applies_both_slots() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        *fake.states.lock().unwrap() = Some(priced("AAPL", 189.5));
        *fake.metrics.lock().unwrap() = Some(SystemMetrics { total_tickers: 1, ..Default::default() });
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        let (states, metrics) = tick(&api, &state);
        states.await.unwrap();
        metrics.await.unwrap();

        let guard = state.read().await;
        assert_eq!(guard.snapshot()["AAPL"].price, Some(189.5));
        assert_eq!(guard.metrics().unwrap().total_tickers, 1);
    }

    #[tokio::test]
    async fn test_state_failure_does_not_block_metrics() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        *fake.states.lock().unwrap() = None;
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        let (states, metrics) = tick(&api, &state);
        states.await.unwrap();
        metrics.await.unwrap();

        let guard = state.read().await;
        assert!(guard.snapshot().is_empty());
        assert!(guard.metrics().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_fixed_cadence_through_failures() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        *fake.states.lock().unwrap() = None;
        *fake.metrics.lock().unwrap() = None;
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        let mut scheduler = StateSyncScheduler::new(Duration::from_secs(15));
        scheduler.start(api, state);
        tokio::time::sleep(Duration::from_secs(31)).await;

        assert!(scheduler.is_running());
        assert_eq!(fake.call_count("bulk_states"), 3);
        assert_eq!(fake.call_count("system_metrics"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_polling() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        let mut scheduler = StateSyncScheduler::new(Duration::from_secs(15));
        scheduler.start(api.clone(), state.clone());
        scheduler.start(api, state);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.call_count("bulk_states"), 1);

        scheduler.stop();
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(fake.call_count("bulk_states"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_now_ticks_early() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        let mut scheduler = StateSyncScheduler::new(Duration::from_secs(15));
        scheduler.start(api, state);
        tokio::time::sleep(Duration::from_secs(1)).await;

        scheduler.refresh_now();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fake.call_count("bulk_states"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_from_earlier_tick_is_discarded() {
        let fake = Arc::new(FakeApi::healthy(&["AAPL"]));
        let api: Arc<dyn DashboardApi> = fake.clone();
        let state = seeded_state(&["AAPL"]).await;

        *fake.states.lock().unwrap() = Some(priced("AAPL", 1.0));
        fake.set_delay("bulk_states", Duration::from_secs(20));
        let (slow, _) = tick(&api, &state);
        tokio::time::sleep(Duration::from_millis(1)).await;

        *fake.states.lock().unwrap() = Some(priced("AAPL", 2.0));
        fake.clear_delays();
        let (fast, _) = tick(&api, &state);
        fast.await.unwrap();
        assert_eq!(state.read().await.snapshot()["AAPL"].price, Some(2.0));

        slow.await.unwrap();
        assert_eq!(state.read().await.snapshot()["AAPL"].price, Some(2.0));
    }
}
