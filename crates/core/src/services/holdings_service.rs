use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::HashMap;

use crate::models::holding::Holding;
use crate::models::ledger::{HoldingsReport, LedgerWarning, WarningReason};
use crate::models::position::{Position, QUANTITY_EPSILON};
use crate::models::quote::{normalize_symbol, CurrentPrices, PriceData};
use crate::models::settings::{LotMethod, OversellPolicy, Settings};
use crate::models::transaction::{Transaction, TransactionType};
use crate::services::performance::{annualized_gain, days_between, percent_of};

/// Folds the transaction log into open holdings and values them.
///
/// Pure business logic — no I/O, no API calls. Never fails: transactions
/// that cannot be applied are skipped (or, for a liquidating oversell,
/// applied) and reported in [`HoldingsReport::warnings`].
#[derive(Debug, Clone, Default)]
pub struct HoldingsService {
    lot_method: LotMethod,
    oversell_policy: OversellPolicy,
}

/// Symbol → position, remembering the order symbols first appeared in.
#[derive(Default)]
struct Ledger {
    positions: HashMap<String, Position>,
    order: Vec<String>,
}

impl HoldingsService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lot_method: settings.lot_method,
            oversell_policy: settings.oversell_policy,
        }
    }

    pub fn with_lot_method(mut self, lot_method: LotMethod) -> Self {
        self.lot_method = lot_method;
        self
    }

    pub fn with_oversell_policy(mut self, policy: OversellPolicy) -> Self {
        self.oversell_policy = policy;
        self
    }

    /// Build the current holdings from `transactions` and value them with
    /// `prices`. Annualized gains are measured up to `as_of`.
    ///
    /// Holdings are ordered by current value, largest first; ties keep the
    /// order in which the symbols first appeared in the log.
    pub fn build_holdings(
        &self,
        transactions: &[Transaction],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> HoldingsReport {
        let (positions, warnings) = self.fold_positions(transactions);
        let report = self.value_positions(&positions, warnings, prices, as_of);
        debug!(
            "Built {} holdings from {} transactions ({} warnings)",
            report.holdings.len(),
            transactions.len(),
            report.warnings.len()
        );
        report
    }

    /// Value already-folded positions. Logs each warning once.
    pub fn value_positions(
        &self,
        positions: &[Position],
        warnings: Vec<LedgerWarning>,
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> HoldingsReport {
        for warning in &warnings {
            warn!("{warning}");
        }

        let mut holdings: Vec<Holding> = positions
            .iter()
            .map(|position| {
                let mut holding = position.to_holding();
                if let Some(price) = prices.get(&holding.symbol) {
                    Self::apply_price(&mut holding, price, as_of);
                }
                holding
            })
            .collect();

        // Largest first; sort_by is stable so ties keep first-seen order
        holdings.sort_by(|a, b| {
            b.current_value
                .partial_cmp(&a.current_value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        HoldingsReport { holdings, warnings }
    }

    /// Fold transactions into open positions, in first-seen symbol order.
    /// Warnings are returned, not logged.
    pub fn fold_positions(&self, transactions: &[Transaction]) -> (Vec<Position>, Vec<LedgerWarning>) {
        let mut ledger = Ledger::default();
        let mut warnings = Vec::new();

        for txn in transactions {
            if let Some(warning) = self.apply_transaction(&mut ledger, txn) {
                warnings.push(warning);
            }
        }

        let Ledger {
            mut positions,
            order,
        } = ledger;
        let open = order
            .iter()
            .filter_map(|symbol| positions.remove(symbol))
            .collect();
        (open, warnings)
    }

    /// Apply one transaction. Returns a warning when it did not apply cleanly.
    fn apply_transaction(&self, ledger: &mut Ledger, txn: &Transaction) -> Option<LedgerWarning> {
        if let Some(reason) = Self::validate(txn) {
            return Some(Self::warning(txn, reason, false));
        }

        // Rows from external feeds may not be normalized yet
        let symbol = normalize_symbol(&txn.symbol);
        match txn.transaction_type {
            TransactionType::Buy => {
                match ledger.positions.get_mut(&symbol) {
                    Some(position) => position.add(txn),
                    None => {
                        if !ledger.order.contains(&symbol) {
                            ledger.order.push(symbol.clone());
                        }
                        ledger.positions.insert(symbol, Position::open(txn));
                    }
                }
                None
            }
            TransactionType::Sell => {
                let Some(position) = ledger.positions.get_mut(&symbol) else {
                    return Some(Self::warning(txn, WarningReason::UnmatchedSell, false));
                };

                let held = position.quantity();
                if txn.quantity > held + QUANTITY_EPSILON {
                    let reason = WarningReason::Oversell {
                        held,
                        requested: txn.quantity,
                    };
                    return match self.oversell_policy {
                        OversellPolicy::Liquidate => {
                            ledger.positions.remove(&symbol);
                            Some(Self::warning(txn, reason, true))
                        }
                        OversellPolicy::Reject => Some(Self::warning(txn, reason, false)),
                    };
                }

                position.reduce(txn.quantity.min(held), self.lot_method);
                if position.is_closed() {
                    ledger.positions.remove(&symbol);
                }
                None
            }
        }
    }

    /// Reject values the fold cannot work with.
    fn validate(txn: &Transaction) -> Option<WarningReason> {
        if !txn.quantity.is_finite() || txn.quantity <= 0.0 {
            return Some(WarningReason::InvalidQuantity(txn.quantity));
        }
        if !txn.price_per_share.is_finite() || txn.price_per_share < 0.0 {
            return Some(WarningReason::InvalidPrice(txn.price_per_share));
        }
        if txn.is_buy() && (!txn.total_cost.is_finite() || txn.total_cost < 0.0) {
            return Some(WarningReason::InvalidTotalCost(txn.total_cost));
        }
        None
    }

    fn warning(txn: &Transaction, reason: WarningReason, applied: bool) -> LedgerWarning {
        LedgerWarning {
            transaction_id: txn.id,
            symbol: normalize_symbol(&txn.symbol),
            date: txn.date,
            reason,
            applied,
        }
    }

    /// Fill in the live fields of a holding from its quote.
    pub fn apply_price(holding: &mut Holding, price: &PriceData, as_of: NaiveDate) {
        holding.priced = true;
        holding.current_price_per_share = price.price;
        holding.current_value = holding.quantity * price.price;
        holding.gain = holding.current_value - holding.book_cost;
        holding.gain_percent = percent_of(holding.gain, holding.book_cost);

        let previous_value = holding.quantity * price.previous_close;
        holding.day_gain = holding.current_value - previous_value;
        holding.day_gain_percent = percent_of(holding.day_gain, previous_value);

        let days = days_between(holding.first_purchase_date, as_of);
        holding.annualized_gain_percent =
            annualized_gain(holding.book_cost, holding.current_value, days);
    }
}
