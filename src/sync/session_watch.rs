use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;
use crate::dashboard::state::SharedState;
use crate::data::types::SessionStatus;
use crate::market::session;

/// Recomputes the session indicator for the selected region on its own
/// timer, independent of the poll loop.
pub struct SessionWatch {
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl SessionWatch {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    pub fn start(&mut self, state: SharedState) {
        if self.is_running() {
            return;
        }

        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                refresh(&state, Utc::now()).await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionWatch {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Store the current session status for the selected region.
pub async fn refresh(state: &SharedState, now: DateTime<Utc>) -> SessionStatus {
    let mut guard = state.write().await;
    let region = guard.region();
    let status = session::status(region, now);

    if guard.set_session(status) {
        info!(%region, status = %status.status, open = status.is_open, "Session status changed");
    }
    status
}
