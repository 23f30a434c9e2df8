use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Canonical form of a ticker symbol: trimmed and uppercased.
///
/// Every symbol that is used as a lookup key goes through this, so `vod`,
/// ` VOD` and `VOD` are the same instrument.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// `deserialize_with` helper that normalizes symbols read from a feed.
pub(crate) fn deserialize_symbol<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(normalize_symbol(&raw))
}

/// The two numbers the calculations need from a live quote.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceData {
    /// Latest traded price per unit
    pub price: f64,

    /// Close of the previous trading session
    pub previous_close: f64,
}

impl PriceData {
    pub fn new(price: f64, previous_close: f64) -> Self {
        Self {
            price,
            previous_close,
        }
    }
}

/// Current price lookup: uppercased symbol → price data.
pub type CurrentPrices = HashMap<String, PriceData>;

/// A full market quote as returned by a quote provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
    pub volume: f64,
    pub exchange: String,
    /// Provider timestamp, passed through verbatim
    pub timestamp: String,
}

impl StockQuote {
    pub fn price_data(&self) -> PriceData {
        PriceData::new(self.price, self.previous_close)
    }
}

/// Build the price lookup from a set of quotes, keyed by uppercased symbol.
pub fn to_current_prices<'a>(quotes: impl IntoIterator<Item = &'a StockQuote>) -> CurrentPrices {
    quotes
        .into_iter()
        .map(|q| (normalize_symbol(&q.symbol), q.price_data()))
        .collect()
}

/// One hit from a symbol search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSearchResult {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    /// Instrument type as reported by the provider (e.g., "Common Stock", "ETF")
    pub instrument_type: String,
    pub currency: String,
}

/// A dated price observation kept in the ledger's price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: String,
    pub date: NaiveDate,
    pub price: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl PriceSnapshot {
    /// Record `quote` as the price on `date`. Zero fields are left empty.
    pub fn from_quote(quote: &StockQuote, date: NaiveDate) -> Self {
        let nonzero = |v: f64| (v != 0.0).then_some(v);
        Self {
            symbol: normalize_symbol(&quote.symbol),
            date,
            price: quote.price,
            open: nonzero(quote.open),
            high: nonzero(quote.high),
            low: nonzero(quote.low),
            close: nonzero(quote.price),
            volume: nonzero(quote.volume),
        }
    }
}
