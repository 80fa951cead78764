use crate::data::types::Region;

const INDIA_SUFFIXES: &[&str] = &[".NS", ".BO"];
const CRYPTO_MARKERS: &[&str] = &["-USD", "USD", "BTC", "ETH"];

/// Classify a symbol into its trading region.
///
/// Total, pure and case-insensitive. The exchange suffix check runs first so
/// an Indian listing is never pulled into CRYPTO by a coincidental substring.
pub fn classify(symbol: &str) -> Region {
    let upper = symbol.to_uppercase();

    if INDIA_SUFFIXES.iter().any(|suffix| upper.ends_with(suffix)) {
        return Region::In;
    }

    if CRYPTO_MARKERS.iter().any(|marker| upper.contains(marker)) {
        return Region::Crypto;
    }

    Region::Us
}
