pub mod errors;
pub mod format;
pub mod models;
pub mod providers;
pub mod services;
pub mod session;
pub mod storage;

use chrono::NaiveDate;
use log::debug;
use models::{
    analytics::{PortfolioSnapshot, PortfolioSummary},
    holding::Holding,
    ledger::HoldingsReport,
    quote::{normalize_symbol, CurrentPrices},
    settings::Settings,
    transaction::Transaction,
    watchlist::WatchlistItem,
};
use providers::traits::LedgerSource;
use services::{
    analytics_service::AnalyticsService, holdings_service::HoldingsService,
    quote_service::QuoteService, watchlist_service::WatchlistService,
};

use errors::CoreError;

pub use services::performance::annualized_gain;

/// Main entry point for the Stock Tracker core library.
/// Holds the settings and all services needed to value a portfolio.
#[must_use]
pub struct StockTracker {
    settings: Settings,
    holdings_service: HoldingsService,
    analytics_service: AnalyticsService,
    watchlist_service: WatchlistService,
}

impl std::fmt::Debug for StockTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockTracker")
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for StockTracker {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl StockTracker {
    pub fn new(settings: Settings) -> Self {
        Self {
            holdings_service: HoldingsService::from_settings(&settings),
            analytics_service: AnalyticsService::new(),
            watchlist_service: WatchlistService::new(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings; lot method and oversell policy apply from the next build.
    pub fn update_settings(&mut self, settings: Settings) {
        self.holdings_service = HoldingsService::from_settings(&settings);
        self.settings = settings;
    }

    // ── Calculations ────────────────────────────────────────────────

    /// Fold the transaction log into valued holdings, plus any warnings.
    #[must_use]
    pub fn build_holdings(
        &self,
        transactions: &[Transaction],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> HoldingsReport {
        self.holdings_service
            .build_holdings(transactions, prices, as_of)
    }

    /// Portfolio-wide totals for a set of holdings.
    #[must_use]
    pub fn summarize(&self, holdings: &[Holding]) -> PortfolioSummary {
        self.analytics_service.summarize(holdings)
    }

    /// Watchlist items valued against current prices.
    #[must_use]
    pub fn enrich_watchlist(
        &self,
        items: &[WatchlistItem],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> Vec<WatchlistItem> {
        self.watchlist_service.enrich(items, prices, as_of)
    }

    /// Holdings, summary and watchlist in one pass over already-loaded data.
    #[must_use]
    pub fn snapshot(
        &self,
        transactions: &[Transaction],
        watchlist: &[WatchlistItem],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> PortfolioSnapshot {
        let report = self.build_holdings(transactions, prices, as_of);
        self.assemble(report, watchlist, prices, as_of)
    }

    fn assemble(
        &self,
        report: HoldingsReport,
        watchlist: &[WatchlistItem],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> PortfolioSnapshot {
        let summary = self.summarize(&report.holdings);
        let watchlist = self.enrich_watchlist(watchlist, prices, as_of);

        PortfolioSnapshot {
            as_of,
            holdings: report.holdings,
            summary,
            watchlist,
            warnings: report.warnings,
        }
    }

    // ── Refresh ─────────────────────────────────────────────────────

    /// Load the ledger, fetch quotes for every held and watched symbol,
    /// and compute a snapshot.
    ///
    /// Symbols without a quote are valued at zero rather than failing the
    /// refresh; only ledger and provider-setup errors are returned.
    pub async fn refresh(
        &self,
        ledger: &dyn LedgerSource,
        quotes: &QuoteService,
        as_of: NaiveDate,
    ) -> Result<PortfolioSnapshot, CoreError> {
        let transactions = ledger.get_transactions().await?;
        let watchlist = ledger.get_watchlist().await?;

        // Fold once: the open positions decide which symbols need a quote
        let (positions, warnings) = self.holdings_service.fold_positions(&transactions);
        let mut symbols: Vec<String> = positions.iter().map(|p| p.symbol.clone()).collect();
        for item in &watchlist {
            let symbol = normalize_symbol(&item.symbol);
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        debug!("Refreshing quotes for {} symbols", symbols.len());

        let prices = if symbols.is_empty() {
            CurrentPrices::new()
        } else {
            quotes.fetch_current_prices(&symbols).await?
        };

        let report = self
            .holdings_service
            .value_positions(&positions, warnings, &prices, as_of);
        Ok(self.assemble(report, &watchlist, &prices, as_of))
    }
}
