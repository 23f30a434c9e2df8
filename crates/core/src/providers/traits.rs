use async_trait::async_trait;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::quote::{StockQuote, StockSearchResult};
use crate::models::transaction::Transaction;
use crate::models::watchlist::WatchlistItem;

/// Source of live market quotes.
///
/// Each market-data API implements this trait; the rest of the crate only
/// sees [`StockQuote`]s.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Latest quote for one symbol, optionally pinned to an exchange.
    async fn get_quote(&self, symbol: &str, exchange: Option<&str>)
        -> Result<StockQuote, CoreError>;

    /// Latest quotes for several symbols in one request.
    /// Symbols the provider cannot quote are absent from the result.
    async fn get_quotes(&self, symbols: &[String])
        -> Result<HashMap<String, StockQuote>, CoreError>;

    /// Search instruments by symbol or name.
    async fn search(
        &self,
        query: &str,
        exchange: Option<&str>,
    ) -> Result<Vec<StockSearchResult>, CoreError>;
}

/// Source of the user's transaction log and watchlist.
///
/// Rows must come back in the order they were recorded; the holdings
/// builder never re-sorts them.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait LedgerSource: Send + Sync {
    async fn get_transactions(&self) -> Result<Vec<Transaction>, CoreError>;

    /// Watchlist base records with all derived fields zeroed.
    async fn get_watchlist(&self) -> Result<Vec<WatchlistItem>, CoreError>;
}
