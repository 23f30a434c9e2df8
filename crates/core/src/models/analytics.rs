use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::holding::Holding;
use super::ledger::LedgerWarning;
use super::watchlist::WatchlistItem;

/// Portfolio-wide totals, recomputed from a holdings snapshot on every call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    /// Sum of holdings' current values
    pub total_value: f64,

    /// Sum of holdings' book costs
    pub total_book_cost: f64,

    /// `total_value - total_book_cost` (summed per holding)
    pub total_gain: f64,

    /// `total_gain / total_book_cost * 100`
    pub total_gain_percent: f64,

    pub total_day_gain: f64,

    /// Day gain relative to the portfolio's value at the previous close
    pub total_day_gain_percent: f64,

    /// Holdings' annualized gains weighted by current value
    pub annualized_gain_percent: f64,
}

/// Everything a dashboard needs, computed at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Date the annualized figures were measured against
    pub as_of: NaiveDate,
    pub holdings: Vec<Holding>,
    pub summary: PortfolioSummary,
    pub watchlist: Vec<WatchlistItem>,
    pub warnings: Vec<LedgerWarning>,
}
