use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current net position in one symbol, valued against a live quote.
///
/// The live fields (`current_price_per_share` through
/// `annualized_gain_percent`) stay at zero when no quote was available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,

    /// Units held (always > 0 for a returned holding)
    pub quantity: f64,

    /// Cost basis of the units still held
    pub book_cost: f64,

    /// `book_cost / quantity`
    pub average_cost_per_share: f64,

    pub current_price_per_share: f64,

    /// `quantity * current_price_per_share`
    pub current_value: f64,

    /// `current_value - book_cost`
    pub gain: f64,
    pub gain_percent: f64,

    /// Change in value since the previous close
    pub day_gain: f64,
    pub day_gain_percent: f64,

    /// Compound annual growth rate implied by gain over the holding period
    pub annualized_gain_percent: f64,

    /// Earliest BUY still contributing to the position
    pub first_purchase_date: NaiveDate,

    pub exchange: String,

    /// Set when a quote was found for the symbol, even if it was zero
    #[serde(default)]
    pub priced: bool,
}

impl Holding {
    /// Whether a quote was applied to this holding.
    pub fn is_priced(&self) -> bool {
        self.priced
    }
}
