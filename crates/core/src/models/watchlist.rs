use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::quote::{deserialize_symbol, normalize_symbol};

/// A tracked symbol that is not held, measured against the price it had
/// when it was added (a hypothetical purchase of one unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistItem {
    #[serde(deserialize_with = "deserialize_symbol")]
    pub symbol: String,
    pub name: String,
    pub date_added: NaiveDate,
    pub price_when_added: f64,
    pub exchange: String,

    // Derived from the current quote; zero until enriched.
    #[serde(default)]
    pub current_price: f64,
    #[serde(default)]
    pub gain_since_added: f64,
    #[serde(default)]
    pub gain_since_added_percent: f64,
    #[serde(default)]
    pub day_gain: f64,
    #[serde(default)]
    pub day_gain_percent: f64,
    #[serde(default)]
    pub annualized_gain_percent: f64,
}

impl WatchlistItem {
    /// A freshly added item with all derived fields zeroed.
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        date_added: NaiveDate,
        price_when_added: f64,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            symbol: normalize_symbol(&Into::<String>::into(symbol)),
            name: name.into(),
            date_added,
            price_when_added,
            exchange: exchange.into(),
            current_price: 0.0,
            gain_since_added: 0.0,
            gain_since_added_percent: 0.0,
            day_gain: 0.0,
            day_gain_percent: 0.0,
            annualized_gain_percent: 0.0,
        }
    }
}
