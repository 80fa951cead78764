use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use crate::data::api::EngineMode;
use crate::data::types::{Region, SignalKind, Snapshot, Symbol, TickerState};
use crate::market::region::classify;

/// Exclusive upper bound for a penny asset, in the asset's native currency.
pub const PENNY_CEILING: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalFilter {
    #[default]
    All,
    Bullish,
    Bearish,
    Neutral,
    Penny,
}

impl SignalFilter {
    /// Backend mode hint that accompanies a switch to this filter.
    pub fn engine_mode(&self) -> EngineMode {
        match self {
            SignalFilter::Bullish => EngineMode::HighFrequency,
            _ => EngineMode::Normal,
        }
    }

    fn admits(&self, state: Option<&TickerState>) -> bool {
        let kind = state.and_then(|s| s.signal.as_ref()).map(|s| s.kind);
        match self {
            SignalFilter::All => true,
            SignalFilter::Bullish => kind == Some(SignalKind::Bullish),
            SignalFilter::Bearish => kind == Some(SignalKind::Bearish),
            SignalFilter::Neutral => kind == Some(SignalKind::Neutral),
            SignalFilter::Penny => state
                .and_then(|s| s.price)
                .map_or(false, |price| price > 0.0 && price < PENNY_CEILING),
        }
    }
}

impl fmt::Display for SignalFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignalFilter::All => "all",
            SignalFilter::Bullish => "bullish",
            SignalFilter::Bearish => "bearish",
            SignalFilter::Neutral => "neutral",
            SignalFilter::Penny => "penny",
        };
        f.write_str(label)
    }
}

impl FromStr for SignalFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SignalFilter::All),
            "bullish" => Ok(SignalFilter::Bullish),
            "bearish" => Ok(SignalFilter::Bearish),
            "neutral" => Ok(SignalFilter::Neutral),
            "penny" => Ok(SignalFilter::Penny),
            other => Err(format!("unknown signal filter: {}", other)),
        }
    }
}

/// Visible symbols for the current selections, in registry order.
///
/// Region, then case-insensitive substring search, then the signal filter.
/// Symbols without a snapshot entry only survive the `All` filter.
pub fn filter(
    registry: &[Symbol],
    snapshot: &Snapshot,
    region: Region,
    search: &str,
    signal_filter: SignalFilter,
) -> Vec<Symbol> {
    let needle = search.to_lowercase();

    registry
        .iter()
        .filter(|symbol| classify(symbol) == region)
        .filter(|symbol| symbol.to_lowercase().contains(&needle))
        .filter(|symbol| signal_filter.admits(snapshot.get(symbol.as_str())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::Signal;

    fn registry() -> Vec<Symbol> {
        ["AAPL", "TSLA", "RELIANCE.NS", "BTC-USD", "SNDL"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn state(price: Option<f64>, kind: Option<SignalKind>) -> TickerState {
        TickerState {
            price,
            signal: kind.map(|kind| Signal {
                kind,
                confidence: 0.6,
                strategy: "bollinger".to_string(),
            }),
        }
    }

    #[test]
    fn test_region_filter_preserves_order() {
        let visible = filter(&registry(), &Snapshot::new(), Region::Us, "", SignalFilter::All);
        assert_eq!(visible, vec!["AAPL", "TSLA", "SNDL"]);

        let visible = filter(
            &["AAPL".to_string(), "TSLA".to_string(), "RELIANCE.NS".to_string()],
            &Snapshot::new(),
            Region::Us,
            "",
            SignalFilter::All,
        );
        assert_eq!(visible, vec!["AAPL", "TSLA"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let visible = filter(&registry(), &Snapshot::new(), Region::Us, "aP", SignalFilter::All);
        assert_eq!(visible, vec!["AAPL"]);

        let visible = filter(&registry(), &Snapshot::new(), Region::In, "reli", SignalFilter::All);
        assert_eq!(visible, vec!["RELIANCE.NS"]);
    }

    #[test]
    fn test_signal_filters_match_exactly() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("AAPL".into(), state(Some(190.0), Some(SignalKind::Bullish)));
        snapshot.insert("TSLA".into(), state(Some(240.0), Some(SignalKind::Bearish)));
        snapshot.insert("SNDL".into(), state(Some(1.9), None));

        let bullish = filter(&registry(), &snapshot, Region::Us, "", SignalFilter::Bullish);
        assert_eq!(bullish, vec!["AAPL"]);
        let bearish = filter(&registry(), &snapshot, Region::Us, "", SignalFilter::Bearish);
        assert_eq!(bearish, vec!["TSLA"]);
        let neutral = filter(&registry(), &snapshot, Region::Us, "", SignalFilter::Neutral);
        assert!(neutral.is_empty());
    }

    #[test]
    fn test_penny_requires_known_low_price() {
        let registry = vec!["AAPL".to_string()];
        let mut snapshot = Snapshot::new();

        snapshot.insert("AAPL".into(), state(Some(3.2), None));
        assert_eq!(filter(&registry, &snapshot, Region::Us, "", SignalFilter::Penny), vec!["AAPL"]);

        snapshot.insert("AAPL".into(), state(Some(10.0), None));
        assert!(filter(&registry, &snapshot, Region::Us, "", SignalFilter::Penny).is_empty());

        snapshot.insert("AAPL".into(), state(None, None));
        assert!(filter(&registry, &snapshot, Region::Us, "", SignalFilter::Penny).is_empty());

        snapshot.remove("AAPL");
        assert!(filter(&registry, &snapshot, Region::Us, "", SignalFilter::Penny).is_empty());
    }

    #[test]
    fn test_penny_bounds_are_exclusive() {
        let registry = vec!["AAPL".to_string()];
        let mut snapshot = Snapshot::new();
        for price in [0.0, 5.0, -1.0] {
            snapshot.insert("AAPL".into(), state(Some(price), None));
            assert!(filter(&registry, &snapshot, Region::Us, "", SignalFilter::Penny).is_empty());
        }
    }

    #[test]
    fn test_filter_is_idempotent() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("TSLA".into(), state(Some(4.0), Some(SignalKind::Neutral)));
        let first = filter(&registry(), &snapshot, Region::Us, "s", SignalFilter::Neutral);
        let second = filter(&registry(), &snapshot, Region::Us, "s", SignalFilter::Neutral);
        assert_eq!(first, second);
        assert_eq!(first, vec!["TSLA"]);
    }

    #[test]
    fn test_engine_mode_per_filter() {
        assert_eq!(SignalFilter::Bullish.engine_mode(), EngineMode::HighFrequency);
        for f in [SignalFilter::All, SignalFilter::Bearish, SignalFilter::Neutral, SignalFilter::Penny] {
            assert_eq!(f.engine_mode(), EngineMode::Normal);
        }
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!("Penny".parse::<SignalFilter>().unwrap(), SignalFilter::Penny);
        assert!("hot".parse::<SignalFilter>().is_err());
    }
}
