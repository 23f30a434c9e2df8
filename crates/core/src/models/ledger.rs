use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::holding::Holding;

/// Why a transaction could not be applied as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WarningReason {
    /// SELL for a symbol with no open position
    UnmatchedSell,
    /// SELL for more units than are held
    Oversell { held: f64, requested: f64 },
    /// Quantity is zero, negative or not a number
    InvalidQuantity(f64),
    /// Price per unit is negative or not a number
    InvalidPrice(f64),
    /// BUY total cost is negative or not a number
    InvalidTotalCost(f64),
}

impl std::fmt::Display for WarningReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WarningReason::UnmatchedSell => write!(f, "sell without an open position"),
            WarningReason::Oversell { held, requested } => {
                write!(f, "sell of {requested} exceeds held quantity {held}")
            }
            WarningReason::InvalidQuantity(q) => write!(f, "invalid quantity {q}"),
            WarningReason::InvalidPrice(p) => write!(f, "invalid price per share {p}"),
            WarningReason::InvalidTotalCost(c) => write!(f, "invalid total cost {c}"),
        }
    }
}

/// A transaction that was skipped or only partly applied while building holdings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerWarning {
    pub transaction_id: Uuid,
    pub symbol: String,
    pub date: NaiveDate,
    pub reason: WarningReason,
    /// `true` when the transaction still changed state (a liquidating oversell).
    pub applied: bool,
}

impl std::fmt::Display for LedgerWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = if self.applied { "applied" } else { "skipped" };
        write!(
            f,
            "Transaction {} ({} on {}) {}: {}",
            self.transaction_id, self.symbol, self.date, action, self.reason
        )
    }
}

/// Output of the holdings builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingsReport {
    /// Open holdings, largest current value first
    pub holdings: Vec<Holding>,

    /// Every transaction that did not apply cleanly, in input order
    pub warnings: Vec<LedgerWarning>,
}

impl HoldingsReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
