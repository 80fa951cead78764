use tracing::{debug, info};
use crate::dashboard::state::DashboardState;
use crate::data::types::Region;
use crate::market::region::classify;

pub fn currency_symbol(symbol: &str) -> &'static str {
    match classify(symbol) {
        Region::In => "₹",
        Region::Us | Region::Crypto => "$",
    }
}

/// Two decimals with thousands separators; unknown prices render as `---`.
pub fn format_price(symbol: &str, price: Option<f64>) -> String {
    match price {
        Some(value) if value.is_finite() => {
            format!("{}{}", currency_symbol(symbol), group_thousands(value))
        }
        _ => "---".to_string(),
    }
}

fn group_thousands(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

pub fn format_uptime(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00:00".to_string();
    }
    let total = seconds as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// One summary line for the dashboard plus a debug line per visible symbol.
pub fn log_summary(state: &DashboardState) {
    let visible = state.visible_symbols();
    let session = state.session();

    info!(
        region = %state.region(),
        session = %session.status,
        filter = %state.signal_filter(),
        search = state.search(),
        visible = visible.len(),
        tracked = state.registry().len(),
        registry_generation = state.registry_generation(),
        loading = state.is_loading(),
        "Dashboard view"
    );

    if let Some(metrics) = state.metrics() {
        info!(
            total = metrics.total_tickers,
            processed = metrics.processed_tickers,
            data_mb = %format!("{:.2}", metrics.data_processed_mb),
            errors = metrics.errors_count,
            uptime = %format_uptime(metrics.uptime_seconds),
            syncing = metrics.is_syncing,
            "Backend metrics"
        );
        if let Some(last_error) = &metrics.last_error {
            debug!("Backend last error: {}", last_error);
        }
    }

    for symbol in &visible {
        let ticker = state.snapshot().get(symbol);
        let price = format_price(symbol, ticker.and_then(|t| t.price));
        match ticker.and_then(|t| t.signal.as_ref()) {
            Some(signal) => debug!(
                "{} {} {} ({:.0}% via {})",
                symbol,
                price,
                signal.kind,
                signal.confidence * 100.0,
                signal.strategy
            ),
            None => debug!("{} {} awaiting signal", symbol, price),
        }
    }

    if let Some(selection) = state.selection() {
        match &selection.forecast {
            Some(forecast) => info!(
                symbol = %selection.symbol,
                bias = %forecast.bias,
                strategy = %forecast.strategy,
                price = %format_price(&selection.symbol, Some(forecast.price)),
                range = %format!(
                    "{} - {}",
                    format_price(&selection.symbol, Some(forecast.expected_range.min)),
                    format_price(&selection.symbol, Some(forecast.expected_range.max))
                ),
                invalidation = %format_price(&selection.symbol, Some(forecast.invalidation_point)),
                points = selection.history.len(),
                "Selected asset forecast"
            ),
            None => info!(
                symbol = %selection.symbol,
                loading = selection.loading,
                points = selection.history.len(),
                "Selected asset has no forecast"
            ),
        }
    }
}
