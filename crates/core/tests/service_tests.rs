// ═══════════════════════════════════════════════════════════════════
// Service Tests — HoldingsService, AnalyticsService, WatchlistService,
// annualized returns, QuoteService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use stock_tracker_core::errors::CoreError;
use stock_tracker_core::models::holding::Holding;
use stock_tracker_core::models::ledger::WarningReason;
use stock_tracker_core::models::quote::{CurrentPrices, PriceData, StockQuote, StockSearchResult};
use stock_tracker_core::models::settings::{LotMethod, OversellPolicy, Settings};
use stock_tracker_core::models::transaction::{Transaction, TransactionType};
use stock_tracker_core::models::watchlist::WatchlistItem;
use stock_tracker_core::providers::traits::QuoteProvider;
use stock_tracker_core::services::analytics_service::AnalyticsService;
use stock_tracker_core::services::holdings_service::HoldingsService;
use stock_tracker_core::services::performance::{annualized_gain, days_between};
use stock_tracker_core::services::quote_service::QuoteService;
use stock_tracker_core::services::watchlist_service::WatchlistService;

// ═══════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn buy(symbol: &str, quantity: f64, price: f64, date: NaiveDate) -> Transaction {
    Transaction::buy(symbol, format!("{symbol} PLC"), quantity, price, date, "LSE")
}

fn sell(symbol: &str, quantity: f64, price: f64, date: NaiveDate) -> Transaction {
    Transaction::sell(symbol, format!("{symbol} PLC"), quantity, price, date, "LSE")
}

fn prices(entries: &[(&str, f64, f64)]) -> CurrentPrices {
    entries
        .iter()
        .map(|(s, p, c)| (s.to_string(), PriceData::new(*p, *c)))
        .collect()
}

/// A holding with only the fields the aggregator reads filled in.
fn valued_holding(symbol: &str, book_cost: f64, value: f64, day_gain: f64, annualized: f64) -> Holding {
    Holding {
        symbol: symbol.into(),
        name: symbol.into(),
        quantity: 1.0,
        book_cost,
        average_cost_per_share: book_cost,
        current_price_per_share: value,
        current_value: value,
        gain: value - book_cost,
        gain_percent: 0.0,
        day_gain,
        day_gain_percent: 0.0,
        annualized_gain_percent: annualized,
        first_purchase_date: make_date(2024, 1, 1),
        exchange: "LSE".into(),
        priced: true,
    }
}

/// A transaction as a ledger feed would deliver it, symbol case untouched.
fn feed_transaction(symbol: &str, kind: &str, quantity: f64, price: f64, date: &str) -> Transaction {
    serde_json::from_value(serde_json::json!({
        "id": uuid::Uuid::new_v4(),
        "symbol": symbol,
        "name": symbol,
        "transaction_type": kind,
        "quantity": quantity,
        "price_per_share": price,
        "total_cost": quantity * price,
        "date": date,
        "exchange": "LSE"
    }))
    .unwrap()
}

const EPS: f64 = 1e-9;

// ═══════════════════════════════════════════════════════════════════
// Holdings builder — folding
// ═══════════════════════════════════════════════════════════════════

mod holdings_fold {
    use super::*;

    #[test]
    fn empty_log_empty_holdings() {
        let svc = HoldingsService::new();
        let report = svc.build_holdings(&[], &CurrentPrices::new(), make_date(2025, 1, 1));
        assert!(report.holdings.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn all_buys_accumulate_quantity_and_cost() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("SHEL", 10.0, 25.0, make_date(2025, 1, 1)),
            buy("SHEL", 5.0, 27.0, make_date(2025, 2, 1)),
            Transaction::new(
                TransactionType::Buy,
                "SHEL",
                "Shell",
                2.5,
                26.0,
                70.0,
                make_date(2025, 3, 1),
                "LSE",
            ),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        assert_eq!(report.holdings.len(), 1);
        let h = &report.holdings[0];
        assert!((h.quantity - 17.5).abs() < EPS);
        assert!((h.book_cost - (250.0 + 135.0 + 70.0)).abs() < EPS);
        assert!((h.average_cost_per_share - 455.0 / 17.5).abs() < EPS);
        assert_eq!(h.first_purchase_date, make_date(2025, 1, 1));
    }

    #[test]
    fn first_buy_average_is_price_per_share() {
        let svc = HoldingsService::new();
        let txns = vec![Transaction::new(
            TransactionType::Buy,
            "BP",
            "BP",
            100.0,
            4.5,
            461.95,
            make_date(2025, 1, 1),
            "LSE",
        )];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 1, 1));
        let h = &report.holdings[0];
        assert_eq!(h.average_cost_per_share, 4.5);
        assert_eq!(h.book_cost, 461.95);
    }

    #[test]
    fn earlier_dated_buy_later_in_log_sets_first_purchase() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("AZN", 1.0, 100.0, make_date(2025, 3, 1)),
            buy("AZN", 1.0, 100.0, make_date(2025, 1, 15)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        assert_eq!(report.holdings[0].first_purchase_date, make_date(2025, 1, 15));
    }

    #[test]
    fn partial_sell_reduces_cost_proportionally() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("ULVR", 10.0, 40.0, make_date(2025, 1, 1)),
            buy("ULVR", 10.0, 50.0, make_date(2025, 2, 1)),
            sell("ULVR", 5.0, 60.0, make_date(2025, 3, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert!((h.quantity - 15.0).abs() < EPS);
        // 900 * (1 - 5/20)
        assert!((h.book_cost - 675.0).abs() < EPS);
        assert!((h.average_cost_per_share - 45.0).abs() < EPS);
        assert!((h.book_cost - h.quantity * h.average_cost_per_share).abs() < EPS);
    }

    #[test]
    fn full_sell_down_removes_symbol() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("VOD", 100.0, 0.7, make_date(2025, 1, 1)),
            sell("VOD", 40.0, 0.8, make_date(2025, 2, 1)),
            sell("VOD", 60.0, 0.9, make_date(2025, 3, 1)),
        ];
        let p = prices(&[("VOD", 0.75, 0.74)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 6, 1));
        assert!(report.holdings.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn float_dust_after_sell_down_is_closed() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("NG", 10.0, 10.0, make_date(2025, 1, 1)),
            sell("NG", 3.3, 10.0, make_date(2025, 2, 1)),
            sell("NG", 6.7, 10.0, make_date(2025, 3, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        assert!(report.holdings.is_empty());
    }

    #[test]
    fn rebuy_after_close_starts_fresh() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("GLEN", 10.0, 4.0, make_date(2024, 1, 1)),
            sell("GLEN", 10.0, 5.0, make_date(2024, 6, 1)),
            buy("GLEN", 2.0, 3.0, make_date(2025, 1, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert_eq!(h.quantity, 2.0);
        assert!((h.book_cost - 6.0).abs() < EPS);
        assert_eq!(h.first_purchase_date, make_date(2025, 1, 1));
    }

    #[test]
    fn unmatched_sell_is_skipped_and_reported() {
        let svc = HoldingsService::new();
        let orphan = sell("PRU", 5.0, 8.0, make_date(2025, 1, 1));
        let orphan_id = orphan.id;
        let report = svc.build_holdings(&[orphan], &CurrentPrices::new(), make_date(2025, 6, 1));
        assert!(report.holdings.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].transaction_id, orphan_id);
        assert_eq!(report.warnings[0].reason, WarningReason::UnmatchedSell);
        assert!(!report.warnings[0].applied);
    }

    #[test]
    fn oversell_liquidates_by_default() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("RIO", 10.0, 50.0, make_date(2025, 1, 1)),
            sell("RIO", 15.0, 55.0, make_date(2025, 2, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        assert!(report.holdings.is_empty());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(
            report.warnings[0].reason,
            WarningReason::Oversell {
                held: 10.0,
                requested: 15.0
            }
        );
        assert!(report.warnings[0].applied);
    }

    #[test]
    fn oversell_rejected_leaves_position() {
        let svc = HoldingsService::new().with_oversell_policy(OversellPolicy::Reject);
        let txns = vec![
            buy("RIO", 10.0, 50.0, make_date(2025, 1, 1)),
            sell("RIO", 15.0, 55.0, make_date(2025, 2, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        assert_eq!(report.holdings.len(), 1);
        assert_eq!(report.holdings[0].quantity, 10.0);
        assert_eq!(report.holdings[0].book_cost, 500.0);
        assert!(!report.warnings[0].applied);
    }

    #[test]
    fn invalid_transactions_are_skipped() {
        let svc = HoldingsService::new();
        let mut negative_qty = buy("BT.A", 1.0, 1.5, make_date(2025, 1, 1));
        negative_qty.quantity = -1.0;
        let mut nan_price = buy("BT.A", 1.0, 1.5, make_date(2025, 1, 1));
        nan_price.price_per_share = f64::NAN;
        let negative_cost = Transaction::new(
            TransactionType::Buy,
            "BT.A",
            "BT",
            1.0,
            1.5,
            -1.5,
            make_date(2025, 1, 1),
            "LSE",
        );
        let zero_sell = sell("BT.A", 0.0, 1.5, make_date(2025, 1, 1));

        let report = svc.build_holdings(
            &[negative_qty, nan_price, negative_cost, zero_sell],
            &CurrentPrices::new(),
            make_date(2025, 6, 1),
        );
        assert!(report.holdings.is_empty());
        assert_eq!(report.warnings.len(), 4);
        assert!(matches!(report.warnings[0].reason, WarningReason::InvalidQuantity(q) if q == -1.0));
        assert!(matches!(report.warnings[1].reason, WarningReason::InvalidPrice(_)));
        assert!(matches!(report.warnings[2].reason, WarningReason::InvalidTotalCost(_)));
        assert!(matches!(report.warnings[3].reason, WarningReason::InvalidQuantity(_)));
    }

    #[test]
    fn fifo_setting_relieves_oldest_lot() {
        let settings = Settings {
            lot_method: LotMethod::Fifo,
            ..Settings::default()
        };
        let svc = HoldingsService::from_settings(&settings);
        let txns = vec![
            buy("LSEG", 10.0, 5.0, make_date(2024, 1, 1)),
            buy("LSEG", 10.0, 10.0, make_date(2025, 1, 1)),
            sell("LSEG", 15.0, 12.0, make_date(2025, 2, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert!((h.book_cost - 50.0).abs() < EPS);
        assert!((h.average_cost_per_share - 10.0).abs() < EPS);
        assert_eq!(h.first_purchase_date, make_date(2025, 1, 1));
    }

    #[test]
    fn lifo_setting_relieves_newest_lot() {
        let svc = HoldingsService::new().with_lot_method(LotMethod::Lifo);
        let txns = vec![
            buy("LSEG", 10.0, 5.0, make_date(2024, 1, 1)),
            buy("LSEG", 10.0, 10.0, make_date(2025, 1, 1)),
            sell("LSEG", 15.0, 12.0, make_date(2025, 2, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert!((h.book_cost - 25.0).abs() < EPS);
        assert!((h.average_cost_per_share - 5.0).abs() < EPS);
        assert_eq!(h.first_purchase_date, make_date(2024, 1, 1));
    }

    #[test]
    fn sell_within_tolerance_of_held_closes_cleanly() {
        for policy in [OversellPolicy::Liquidate, OversellPolicy::Reject] {
            let svc = HoldingsService::new().with_oversell_policy(policy);
            let txns = vec![
                buy("III", 10.0, 20.0, make_date(2025, 1, 1)),
                sell("III", 10.0 + 5e-10, 21.0, make_date(2025, 2, 1)),
            ];
            let report = svc.build_holdings(&txns, &CurrentPrices::new(), make_date(2025, 6, 1));
            assert!(report.holdings.is_empty());
            assert!(report.is_clean());
        }
    }

    #[test]
    fn sell_within_tolerance_under_fifo_empties_lots() {
        let svc = HoldingsService::new().with_lot_method(LotMethod::Fifo);
        let txns = vec![
            buy("III", 4.0, 20.0, make_date(2025, 1, 1)),
            buy("III", 6.0, 22.0, make_date(2025, 1, 2)),
            sell("III", 10.0 + 5e-10, 21.0, make_date(2025, 2, 1)),
        ];
        let (positions, warnings) = svc.fold_positions(&txns);
        assert!(positions.is_empty());
        assert!(warnings.is_empty());
    }

    #[test]
    fn liquidated_then_rebought_symbol_keeps_first_seen_slot() {
        let svc = HoldingsService::new();
        let d = make_date(2025, 1, 1);
        let txns = vec![
            buy("AAA", 1.0, 1.0, d),
            buy("BBB", 1.0, 1.0, d),
            sell("AAA", 5.0, 1.0, d),
            buy("AAA", 1.0, 1.0, make_date(2025, 2, 1)),
        ];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), d);
        let symbols: Vec<&str> = report.holdings.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
        assert_eq!(report.holdings[0].first_purchase_date, make_date(2025, 2, 1));
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn symbols_from_feed_are_case_insensitive() {
        let svc = HoldingsService::new();
        let txns = vec![
            feed_transaction("vod", "BUY", 100.0, 0.7, "2025-01-01"),
            feed_transaction(" VOD", "BUY", 100.0, 0.8, "2025-01-02"),
            feed_transaction("Vod", "SELL", 50.0, 0.9, "2025-01-03"),
        ];
        let p = prices(&[("VOD", 0.75, 0.74)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 1, 3));
        assert_eq!(report.holdings.len(), 1);
        let h = &report.holdings[0];
        assert_eq!(h.symbol, "VOD");
        assert!((h.quantity - 150.0).abs() < EPS);
        assert!(h.is_priced());
        assert!((h.current_value - 112.5).abs() < 1e-9);
        assert!(report.is_clean());
    }

    #[test]
    fn unnormalized_symbol_set_after_construction_still_matches() {
        let svc = HoldingsService::new();
        let mut txn = buy("BARC", 10.0, 2.0, make_date(2025, 1, 1));
        txn.symbol = "barc".into();
        let report = svc.build_holdings(&[txn], &prices(&[("BARC", 2.5, 2.4)]), make_date(2025, 1, 1));
        assert_eq!(report.holdings[0].symbol, "BARC");
        assert!((report.holdings[0].current_value - 25.0).abs() < EPS);
    }

    #[test]
    fn fold_positions_keeps_first_seen_order() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("REL", 1.0, 1.0, make_date(2025, 1, 1)),
            buy("AAL", 1.0, 1.0, make_date(2025, 1, 2)),
            buy("REL", 1.0, 1.0, make_date(2025, 1, 3)),
        ];
        let (positions, warnings) = svc.fold_positions(&txns);
        let symbols: Vec<&str> = positions.iter().map(|p| p.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["REL", "AAL"]);
        assert!(warnings.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Holdings builder — valuation
// ═══════════════════════════════════════════════════════════════════

mod holdings_valuation {
    use super::*;

    #[test]
    fn end_to_end_single_buy() {
        let svc = HoldingsService::new();
        let day0 = make_date(2025, 1, 1);
        let txns = vec![buy("SHEL", 10.0, 5.0, day0)];
        let p = prices(&[("SHEL", 6.0, 5.5)]);

        let report = svc.build_holdings(&txns, &p, day0);
        assert_eq!(report.holdings.len(), 1);
        let h = &report.holdings[0];
        assert_eq!(h.quantity, 10.0);
        assert_eq!(h.book_cost, 50.0);
        assert_eq!(h.current_price_per_share, 6.0);
        assert!((h.current_value - 60.0).abs() < EPS);
        assert!((h.gain - 10.0).abs() < EPS);
        assert!((h.gain_percent - 20.0).abs() < EPS);
        assert!((h.day_gain - 5.0).abs() < EPS);
        assert!((h.day_gain_percent - 5.0 / 55.0 * 100.0).abs() < EPS);
        assert!((h.day_gain_percent - 9.09).abs() < 0.01);
        // No time has passed
        assert_eq!(h.annualized_gain_percent, 0.0);
    }

    #[test]
    fn annualized_gain_uses_first_purchase_date() {
        let svc = HoldingsService::new();
        let txns = vec![buy("AZN", 10.0, 100.0, make_date(2021, 1, 1))];
        let p = prices(&[("AZN", 200.0, 200.0)]);
        // 2021-01-01 → 2025-01-01 is 1461 days = exactly 4 years of 365.25
        let report = svc.build_holdings(&txns, &p, make_date(2025, 1, 1));
        let h = &report.holdings[0];
        let expected = (2f64.powf(0.25) - 1.0) * 100.0;
        assert!((h.annualized_gain_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_price_leaves_live_fields_zero() {
        let svc = HoldingsService::new();
        let txns = vec![buy("HSBA", 10.0, 6.0, make_date(2025, 1, 1))];
        let p = prices(&[("BARC", 2.0, 2.0)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert_eq!(h.current_price_per_share, 0.0);
        assert_eq!(h.current_value, 0.0);
        assert_eq!(h.gain, 0.0);
        assert_eq!(h.gain_percent, 0.0);
        assert_eq!(h.day_gain, 0.0);
        assert_eq!(h.day_gain_percent, 0.0);
        assert_eq!(h.annualized_gain_percent, 0.0);
        assert_eq!(h.book_cost, 60.0);
    }

    #[test]
    fn zero_price_quote_still_counts_as_priced() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("DEAD", 10.0, 1.0, make_date(2025, 1, 1)),
            buy("NOQT", 10.0, 1.0, make_date(2025, 1, 1)),
        ];
        let p = prices(&[("DEAD", 0.0, 0.0)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 6, 1));
        let dead = report.holdings.iter().find(|h| h.symbol == "DEAD").unwrap();
        let unquoted = report.holdings.iter().find(|h| h.symbol == "NOQT").unwrap();
        assert!(dead.is_priced());
        assert!((dead.gain + 10.0).abs() < EPS);
        assert!(!unquoted.is_priced());
        assert_eq!(unquoted.gain, 0.0);
    }

    #[test]
    fn zero_previous_close_gives_zero_day_gain_percent() {
        let svc = HoldingsService::new();
        let txns = vec![buy("DGE", 10.0, 20.0, make_date(2025, 1, 1))];
        let p = prices(&[("DGE", 25.0, 0.0)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 1, 1));
        let h = &report.holdings[0];
        assert!((h.day_gain - 250.0).abs() < EPS);
        assert_eq!(h.day_gain_percent, 0.0);
    }

    #[test]
    fn zero_book_cost_gives_zero_gain_percent() {
        let svc = HoldingsService::new();
        // Free shares (e.g. a promotion)
        let txns = vec![buy("BATS", 5.0, 0.0, make_date(2025, 1, 1))];
        let p = prices(&[("BATS", 30.0, 29.0)]);
        let report = svc.build_holdings(&txns, &p, make_date(2025, 6, 1));
        let h = &report.holdings[0];
        assert!((h.gain - 150.0).abs() < EPS);
        assert_eq!(h.gain_percent, 0.0);
        assert_eq!(h.annualized_gain_percent, 0.0);
    }

    #[test]
    fn sorted_by_current_value_descending() {
        let svc = HoldingsService::new();
        let d = make_date(2025, 1, 1);
        let txns = vec![
            buy("SMALL", 1.0, 1.0, d),
            buy("BIG", 1.0, 1.0, d),
            buy("MID", 1.0, 1.0, d),
        ];
        let p = prices(&[("SMALL", 1.0, 1.0), ("BIG", 100.0, 90.0), ("MID", 10.0, 9.0)]);
        let report = svc.build_holdings(&txns, &p, d);
        let symbols: Vec<&str> = report.holdings.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BIG", "MID", "SMALL"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let svc = HoldingsService::new();
        let d = make_date(2025, 1, 1);
        let txns = vec![buy("ZED", 1.0, 1.0, d), buy("ALPHA", 1.0, 1.0, d), buy("MID", 1.0, 1.0, d)];
        let report = svc.build_holdings(&txns, &CurrentPrices::new(), d);
        let symbols: Vec<&str> = report.holdings.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["ZED", "ALPHA", "MID"]);
    }

    #[test]
    fn same_input_same_output() {
        let svc = HoldingsService::new();
        let txns = vec![
            buy("SHEL", 10.0, 25.0, make_date(2024, 1, 1)),
            sell("SHEL", 2.0, 27.0, make_date(2024, 6, 1)),
        ];
        let p = prices(&[("SHEL", 28.0, 27.5)]);
        let a = svc.build_holdings(&txns, &p, make_date(2025, 1, 1));
        let b = svc.build_holdings(&txns, &p, make_date(2025, 1, 1));
        assert_eq!(a, b);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Portfolio aggregator
// ═══════════════════════════════════════════════════════════════════

mod analytics {
    use super::*;

    #[test]
    fn empty_holdings_all_zero() {
        let s = AnalyticsService::new().summarize(&[]);
        assert_eq!(s.total_value, 0.0);
        assert_eq!(s.total_book_cost, 0.0);
        assert_eq!(s.total_gain, 0.0);
        assert_eq!(s.total_gain_percent, 0.0);
        assert_eq!(s.total_day_gain, 0.0);
        assert_eq!(s.total_day_gain_percent, 0.0);
        assert_eq!(s.annualized_gain_percent, 0.0);
    }

    #[test]
    fn totals_are_sums() {
        let holdings = vec![
            valued_holding("A", 100.0, 120.0, 2.0, 5.0),
            valued_holding("B", 50.0, 40.0, -1.0, -3.0),
        ];
        let s = AnalyticsService::default().summarize(&holdings);
        assert!((s.total_value - 160.0).abs() < EPS);
        assert!((s.total_book_cost - 150.0).abs() < EPS);
        assert!((s.total_gain - 10.0).abs() < EPS);
        assert!((s.total_gain_percent - 10.0 / 150.0 * 100.0).abs() < EPS);
        assert!((s.total_day_gain - 1.0).abs() < EPS);
        // Opening value = 160 - 1
        assert!((s.total_day_gain_percent - 1.0 / 159.0 * 100.0).abs() < EPS);
    }

    #[test]
    fn equal_values_average_annualized_gain() {
        let holdings = vec![
            valued_holding("A", 80.0, 100.0, 0.0, 10.0),
            valued_holding("B", 90.0, 100.0, 0.0, 20.0),
        ];
        let s = AnalyticsService::new().summarize(&holdings);
        assert!((s.annualized_gain_percent - 15.0).abs() < EPS);
    }

    #[test]
    fn annualized_gain_is_value_weighted() {
        let holdings = vec![
            valued_holding("A", 100.0, 300.0, 0.0, 10.0),
            valued_holding("B", 100.0, 100.0, 0.0, 30.0),
        ];
        let s = AnalyticsService::new().summarize(&holdings);
        assert!((s.annualized_gain_percent - 15.0).abs() < EPS);
    }

    #[test]
    fn zero_total_value_guards_weighting() {
        let holdings = vec![
            valued_holding("A", 100.0, 0.0, 0.0, 25.0),
            valued_holding("B", 100.0, 0.0, 0.0, -5.0),
        ];
        let s = AnalyticsService::new().summarize(&holdings);
        assert_eq!(s.annualized_gain_percent, 0.0);
        assert_eq!(s.total_day_gain_percent, 0.0);
        assert!(s.total_gain_percent.is_finite());
        assert!((s.total_gain_percent + 100.0).abs() < EPS);
    }

    #[test]
    fn matches_end_to_end_holding() {
        let svc = HoldingsService::new();
        let d = make_date(2025, 1, 1);
        let report = svc.build_holdings(
            &[buy("SHEL", 10.0, 5.0, d)],
            &prices(&[("SHEL", 6.0, 5.5)]),
            d,
        );
        let s = AnalyticsService::new().summarize(&report.holdings);
        assert!((s.total_value - 60.0).abs() < EPS);
        assert!((s.total_gain_percent - 20.0).abs() < EPS);
        assert!((s.total_day_gain_percent - 5.0 / 55.0 * 100.0).abs() < EPS);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Annualized return
// ═══════════════════════════════════════════════════════════════════

mod annualized {
    use super::*;

    #[test]
    fn doubling_in_a_year() {
        assert!((annualized_gain(100.0, 200.0, 365) - 100.0).abs() < 0.2);
    }

    #[test]
    fn doubling_over_four_exact_years() {
        let expected = (2f64.powf(0.25) - 1.0) * 100.0;
        assert!((annualized_gain(100.0, 200.0, 1461) - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_days() {
        assert_eq!(annualized_gain(100.0, 100.0, 0), 0.0);
        assert_eq!(annualized_gain(100.0, 500.0, 0), 0.0);
    }

    #[test]
    fn zero_initial_value() {
        assert_eq!(annualized_gain(0.0, 100.0, 365), 0.0);
    }

    #[test]
    fn no_change_is_zero() {
        assert!(annualized_gain(100.0, 100.0, 200).abs() < 1e-12);
    }

    #[test]
    fn loss_over_four_years() {
        let expected = (0.5f64.powf(0.25) - 1.0) * 100.0;
        assert!((annualized_gain(100.0, 50.0, 1461) - expected).abs() < 1e-9);
    }

    #[test]
    fn total_loss_saturates() {
        assert_eq!(annualized_gain(100.0, 0.0, 100), -100.0);
        assert_eq!(annualized_gain(100.0, -20.0, 100), -100.0);
        assert_eq!(annualized_gain(100.0, 0.0, 1000), -100.0);
    }

    #[test]
    fn days_between_is_order_independent() {
        let a = make_date(2025, 1, 1);
        let b = make_date(2025, 3, 1);
        assert_eq!(days_between(a, b), 59);
        assert_eq!(days_between(b, a), 59);
        assert_eq!(days_between(a, a), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Watchlist enricher
// ═══════════════════════════════════════════════════════════════════

mod watchlist {
    use super::*;

    fn items() -> Vec<WatchlistItem> {
        vec![
            WatchlistItem::new("ULVR", "Unilever", make_date(2025, 1, 1), 100.0, "LSE"),
            WatchlistItem::new("RKT", "Reckitt", make_date(2025, 1, 1), 50.0, "LSE"),
        ]
    }

    #[test]
    fn enriches_matched_items() {
        let p = prices(&[("ULVR", 110.0, 105.0)]);
        let out = WatchlistService::new().enrich(&items(), &p, make_date(2025, 1, 1));
        let u = &out[0];
        assert_eq!(u.current_price, 110.0);
        assert!((u.gain_since_added - 10.0).abs() < EPS);
        assert!((u.gain_since_added_percent - 10.0).abs() < EPS);
        assert!((u.day_gain - 5.0).abs() < EPS);
        assert!((u.day_gain_percent - 5.0 / 105.0 * 100.0).abs() < EPS);
        assert_eq!(u.annualized_gain_percent, 0.0);
    }

    #[test]
    fn unmatched_items_unchanged() {
        let mut input = items();
        input[1].current_price = 42.0;
        let p = prices(&[("ULVR", 110.0, 105.0)]);
        let out = WatchlistService::new().enrich(&input, &p, make_date(2025, 1, 1));
        assert_eq!(out[1], input[1]);
    }

    #[test]
    fn preserves_length_and_order() {
        let p = prices(&[("RKT", 55.0, 54.0), ("ULVR", 110.0, 105.0)]);
        let out = WatchlistService::new().enrich(&items(), &p, make_date(2025, 1, 1));
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].symbol, "ULVR");
        assert_eq!(out[1].symbol, "RKT");
    }

    #[test]
    fn idempotent() {
        let svc = WatchlistService::new();
        let p = prices(&[("RKT", 55.0, 54.0), ("ULVR", 110.0, 105.0)]);
        let once = svc.enrich(&items(), &p, make_date(2025, 6, 1));
        let twice = svc.enrich(&once, &p, make_date(2025, 6, 1));
        assert_eq!(once, twice);
    }

    #[test]
    fn annualized_over_four_years() {
        let item = WatchlistItem::new("AZN", "AstraZeneca", make_date(2021, 1, 1), 100.0, "LSE");
        let p = prices(&[("AZN", 200.0, 199.0)]);
        let out = WatchlistService::new().enrich(&[item], &p, make_date(2025, 1, 1));
        let expected = (2f64.powf(0.25) - 1.0) * 100.0;
        assert!((out[0].annualized_gain_percent - expected).abs() < 1e-9);
    }

    #[test]
    fn zero_reference_prices_guarded() {
        let item = WatchlistItem::new("NEW", "New listing", make_date(2025, 1, 1), 0.0, "LSE");
        let p = prices(&[("NEW", 10.0, 0.0)]);
        let out = WatchlistService::new().enrich(&[item], &p, make_date(2025, 6, 1));
        assert!((out[0].gain_since_added - 10.0).abs() < EPS);
        assert_eq!(out[0].gain_since_added_percent, 0.0);
        assert_eq!(out[0].day_gain_percent, 0.0);
        assert_eq!(out[0].annualized_gain_percent, 0.0);
    }

    #[test]
    fn lowercase_feed_item_matches_uppercase_prices() {
        let item: WatchlistItem = serde_json::from_value(serde_json::json!({
            "symbol": "ulvr",
            "name": "Unilever",
            "date_added": "2025-01-01",
            "price_when_added": 100.0,
            "exchange": "LSE"
        }))
        .unwrap();
        assert_eq!(item.symbol, "ULVR");

        let mut raw = item.clone();
        raw.symbol = "ulvr".into();
        let p = prices(&[("ULVR", 110.0, 105.0)]);
        for input in [item, raw] {
            let out = WatchlistService::new().enrich(&[input], &p, make_date(2025, 1, 1));
            assert_eq!(out[0].symbol, "ULVR");
            assert_eq!(out[0].current_price, 110.0);
        }
    }

    #[test]
    fn empty_watchlist() {
        let out = WatchlistService::default().enrich(&[], &CurrentPrices::new(), make_date(2025, 1, 1));
        assert!(out.is_empty());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Quote service — mock providers
// ═══════════════════════════════════════════════════════════════════

struct MockQuoteProvider {
    name: String,
    prices: HashMap<String, (f64, f64)>,
}

impl MockQuoteProvider {
    fn new(name: &str, entries: &[(&str, f64, f64)]) -> Self {
        Self {
            name: name.into(),
            prices: entries
                .iter()
                .map(|(s, p, c)| (s.to_string(), (*p, *c)))
                .collect(),
        }
    }

    fn make_quote(&self, symbol: &str) -> Option<StockQuote> {
        self.prices.get(symbol).map(|(price, prev)| StockQuote {
            symbol: symbol.into(),
            name: symbol.into(),
            price: *price,
            change: price - prev,
            change_percent: 0.0,
            open: *prev,
            high: *price,
            low: *prev,
            previous_close: *prev,
            volume: 0.0,
            exchange: "LSE".into(),
            timestamp: "2025-06-02".into(),
        })
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_quote(&self, symbol: &str, _exchange: Option<&str>) -> Result<StockQuote, CoreError> {
        self.make_quote(symbol).ok_or(CoreError::QuoteNotAvailable {
            symbol: symbol.into(),
        })
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<HashMap<String, StockQuote>, CoreError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.make_quote(s).map(|q| (s.clone(), q)))
            .collect())
    }

    async fn search(&self, _query: &str, _exchange: Option<&str>) -> Result<Vec<StockSearchResult>, CoreError> {
        Ok(vec![])
    }
}

struct FailingQuoteProvider;

#[async_trait]
impl QuoteProvider for FailingQuoteProvider {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn get_quote(&self, _symbol: &str, _exchange: Option<&str>) -> Result<StockQuote, CoreError> {
        Err(CoreError::Network("connection refused".into()))
    }

    async fn get_quotes(&self, _symbols: &[String]) -> Result<HashMap<String, StockQuote>, CoreError> {
        Err(CoreError::Network("connection refused".into()))
    }

    async fn search(&self, _query: &str, _exchange: Option<&str>) -> Result<Vec<StockSearchResult>, CoreError> {
        Err(CoreError::Network("connection refused".into()))
    }
}

mod quote_service {
    use super::*;

    #[tokio::test]
    async fn empty_request_needs_no_provider() {
        let svc = QuoteService::new();
        let quotes = svc.fetch_quotes(&[]).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn no_provider_fails() {
        let svc = QuoteService::new();
        let result = svc.fetch_quotes(&["SHEL".to_string()]).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))));
    }

    #[tokio::test]
    async fn fetch_current_prices_converts_quotes() {
        let mut svc = QuoteService::new();
        svc.register(Box::new(MockQuoteProvider::new("Primary", &[("SHEL", 27.0, 26.5)])));
        let prices = svc.fetch_current_prices(&["shel".to_string()]).await.unwrap();
        assert_eq!(prices.get("SHEL"), Some(&PriceData::new(27.0, 26.5)));
    }

    #[tokio::test]
    async fn falls_back_for_missing_symbols() {
        let mut svc = QuoteService::new();
        svc.register(Box::new(MockQuoteProvider::new("Primary", &[("SHEL", 27.0, 26.5)])));
        svc.register(Box::new(MockQuoteProvider::new(
            "Secondary",
            &[("SHEL", 1.0, 1.0), ("BP", 4.5, 4.4)],
        )));
        let quotes = svc
            .fetch_quotes(&["SHEL".to_string(), "BP".to_string()])
            .await
            .unwrap();
        assert_eq!(quotes.len(), 2);
        // Primary wins for symbols it can quote
        assert_eq!(quotes["SHEL"].price, 27.0);
        assert_eq!(quotes["BP"].price, 4.5);
    }

    #[tokio::test]
    async fn failing_provider_is_skipped() {
        let mut svc = QuoteService::default();
        svc.register(Box::new(FailingQuoteProvider));
        svc.register(Box::new(MockQuoteProvider::new("Backup", &[("VOD", 0.7, 0.69)])));
        let quotes = svc.fetch_quotes(&["VOD".to_string()]).await.unwrap();
        assert_eq!(quotes["VOD"].previous_close, 0.69);
        assert_eq!(svc.provider_names(), vec!["Failing", "Backup"]);
    }

    #[tokio::test]
    async fn unquotable_symbols_are_absent() {
        let mut svc = QuoteService::new();
        svc.register(Box::new(FailingQuoteProvider));
        let quotes = svc.fetch_quotes(&["XYZ".to_string()]).await.unwrap();
        assert!(quotes.is_empty());
    }

    #[tokio::test]
    async fn duplicate_symbols_requested_once() {
        let mut svc = QuoteService::new();
        svc.register(Box::new(MockQuoteProvider::new("Primary", &[("BP", 4.5, 4.4)])));
        let quotes = svc
            .fetch_quotes(&["bp".to_string(), "BP".to_string()])
            .await
            .unwrap();
        assert_eq!(quotes.len(), 1);
    }
}
