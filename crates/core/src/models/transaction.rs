use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quote::{deserialize_symbol, normalize_symbol};

/// Direction of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Units acquired
    Buy,
    /// Units disposed of
    Sell,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Buy => write!(f, "BUY"),
            TransactionType::Sell => write!(f, "SELL"),
        }
    }
}

/// A single buy/sell record from the transaction log.
///
/// Transactions are processed in the order they are supplied, never
/// re-sorted by date. Callers are expected to pass them chronologically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier
    pub id: Uuid,

    /// Ticker symbol, uppercased (e.g., "SHEL", "VOD")
    #[serde(deserialize_with = "deserialize_symbol")]
    pub symbol: String,

    /// Human-readable instrument name
    pub name: String,

    /// Buy or Sell
    pub transaction_type: TransactionType,

    /// Number of units (always positive)
    pub quantity: f64,

    /// Price paid or received per unit
    pub price_per_share: f64,

    /// Total amount paid (BUY) or received (SELL), including any fees
    pub total_cost: f64,

    /// Date of the trade (daily granularity)
    pub date: NaiveDate,

    /// Exchange tag (e.g., "LSE")
    pub exchange: String,

    /// Optional free-text notes
    #[serde(default)]
    pub notes: Option<String>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transaction_type: TransactionType,
        symbol: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        price_per_share: f64,
        total_cost: f64,
        date: NaiveDate,
        exchange: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            symbol: normalize_symbol(&Into::<String>::into(symbol)),
            name: name.into(),
            transaction_type,
            quantity,
            price_per_share,
            total_cost,
            date,
            exchange: exchange.into(),
            notes: None,
        }
    }

    /// A BUY whose total cost is exactly `quantity * price_per_share`.
    pub fn buy(
        symbol: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        price_per_share: f64,
        date: NaiveDate,
        exchange: impl Into<String>,
    ) -> Self {
        Self::new(
            TransactionType::Buy,
            symbol,
            name,
            quantity,
            price_per_share,
            quantity * price_per_share,
            date,
            exchange,
        )
    }

    /// A SELL whose proceeds are exactly `quantity * price_per_share`.
    pub fn sell(
        symbol: impl Into<String>,
        name: impl Into<String>,
        quantity: f64,
        price_per_share: f64,
        date: NaiveDate,
        exchange: impl Into<String>,
    ) -> Self {
        Self::new(
            TransactionType::Sell,
            symbol,
            name,
            quantity,
            price_per_share,
            quantity * price_per_share,
            date,
            exchange,
        )
    }

    /// Attach notes to the transaction.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn is_buy(&self) -> bool {
        self.transaction_type == TransactionType::Buy
    }
}
