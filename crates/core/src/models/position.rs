use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use super::holding::Holding;
use super::quote::normalize_symbol;
use super::settings::LotMethod;
use super::transaction::Transaction;

/// Quantities at or below this are treated as a closed position.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// The still-open part of a single BUY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// The BUY transaction this lot came from
    pub transaction_id: Uuid,
    pub quantity: f64,
    /// Cost basis of `quantity` units
    pub cost: f64,
    pub acquired: NaiveDate,
}

/// An in-progress holding while the transaction log is being folded.
///
/// Keeps the open lots so that any [`LotMethod`] can be applied; under
/// `AverageCost` the lots are scaled down proportionally on every sell.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    lots: VecDeque<Lot>,
    quantity: f64,
    book_cost: f64,
    average_cost: f64,
    first_purchase_date: NaiveDate,
}

impl Position {
    /// Open a position from its first BUY.
    pub fn open(txn: &Transaction) -> Self {
        let mut lots = VecDeque::new();
        lots.push_back(Lot {
            transaction_id: txn.id,
            quantity: txn.quantity,
            cost: txn.total_cost,
            acquired: txn.date,
        });
        Self {
            symbol: normalize_symbol(&txn.symbol),
            name: txn.name.clone(),
            exchange: txn.exchange.clone(),
            lots,
            quantity: txn.quantity,
            book_cost: txn.total_cost,
            average_cost: txn.price_per_share,
            first_purchase_date: txn.date,
        }
    }

    /// Add a subsequent BUY.
    pub fn add(&mut self, txn: &Transaction) {
        self.lots.push_back(Lot {
            transaction_id: txn.id,
            quantity: txn.quantity,
            cost: txn.total_cost,
            acquired: txn.date,
        });
        self.quantity += txn.quantity;
        self.book_cost += txn.total_cost;
        self.average_cost = self.book_cost / self.quantity;
        if txn.date < self.first_purchase_date {
            self.first_purchase_date = txn.date;
        }
    }

    /// Remove `quantity` units and return the cost basis relieved.
    ///
    /// The caller guarantees `quantity <= self.quantity()`.
    pub fn reduce(&mut self, quantity: f64, method: LotMethod) -> f64 {
        let relieved = match method {
            LotMethod::AverageCost => self.relieve_average(quantity),
            LotMethod::Fifo => self.relieve_lots(quantity, true),
            LotMethod::Lifo => self.relieve_lots(quantity, false),
        };

        self.quantity -= quantity;
        if self.is_closed() {
            self.quantity = 0.0;
            self.book_cost = 0.0;
            self.average_cost = 0.0;
        } else {
            self.average_cost = self.book_cost / self.quantity;
        }
        relieved
    }

    fn relieve_average(&mut self, quantity: f64) -> f64 {
        let sell_ratio = quantity / self.quantity;
        let keep = 1.0 - sell_ratio;
        for lot in self.lots.iter_mut() {
            lot.quantity *= keep;
            lot.cost *= keep;
        }
        let relieved = self.book_cost * sell_ratio;
        self.book_cost -= relieved;
        relieved
    }

    fn relieve_lots(&mut self, quantity: f64, oldest_first: bool) -> f64 {
        let mut remaining = quantity;
        let mut relieved = 0.0;

        while remaining > QUANTITY_EPSILON {
            let lot = if oldest_first {
                self.lots.front_mut()
            } else {
                self.lots.back_mut()
            };
            let Some(lot) = lot else { break };

            if lot.quantity <= remaining + QUANTITY_EPSILON {
                remaining -= lot.quantity;
                relieved += lot.cost;
                if oldest_first {
                    self.lots.pop_front();
                } else {
                    self.lots.pop_back();
                }
            } else {
                let cost = lot.cost * remaining / lot.quantity;
                lot.quantity -= remaining;
                lot.cost -= cost;
                relieved += cost;
                remaining = 0.0;
            }
        }

        self.book_cost = self.lots.iter().map(|l| l.cost).sum();
        if let Some(earliest) = self.lots.iter().map(|l| l.acquired).min() {
            self.first_purchase_date = earliest;
        }
        relieved
    }

    pub fn quantity(&self) -> f64 {
        self.quantity
    }

    pub fn book_cost(&self) -> f64 {
        self.book_cost
    }

    pub fn average_cost(&self) -> f64 {
        self.average_cost
    }

    pub fn first_purchase_date(&self) -> NaiveDate {
        self.first_purchase_date
    }

    pub fn lots(&self) -> &VecDeque<Lot> {
        &self.lots
    }

    pub fn is_closed(&self) -> bool {
        self.quantity <= QUANTITY_EPSILON
    }

    /// Snapshot as an unpriced holding (all live fields zero).
    pub fn to_holding(&self) -> Holding {
        Holding {
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            quantity: self.quantity,
            book_cost: self.book_cost,
            average_cost_per_share: self.average_cost,
            current_price_per_share: 0.0,
            current_value: 0.0,
            gain: 0.0,
            gain_percent: 0.0,
            day_gain: 0.0,
            day_gain_percent: 0.0,
            annualized_gain_percent: 0.0,
            first_purchase_date: self.first_purchase_date,
            exchange: self.exchange.clone(),
            priced: false,
        }
    }
}
