use log::{debug, warn};
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::quote::{normalize_symbol, to_current_prices, CurrentPrices, StockQuote};
use crate::providers::traits::QuoteProvider;
use crate::providers::twelve_data::TwelveDataProvider;
use crate::session::Session;

/// Fetches current quotes from one or more providers.
///
/// Providers are asked in registration order; each one only receives the
/// symbols the previous ones could not quote. A failing provider is logged
/// and skipped, so the result may be partial but the call itself only fails
/// when there is nothing to ask.
pub struct QuoteService {
    providers: Vec<Box<dyn QuoteProvider>>,
}

impl QuoteService {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Build the default provider set from an unlocked session.
    pub fn from_session(session: &Session) -> Result<Self, CoreError> {
        let keys = session.api_keys()?;
        let mut service = Self::new();
        service.register(Box::new(TwelveDataProvider::new(
            keys.twelve_data_api_key.clone(),
        )));
        Ok(service)
    }

    /// Register a provider. Earlier registrations take priority.
    pub fn register(&mut self, provider: Box<dyn QuoteProvider>) {
        self.providers.push(provider);
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Quotes for `symbols`, keyed by uppercased symbol.
    pub async fn fetch_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, StockQuote>, CoreError> {
        let mut quotes = HashMap::new();
        let mut missing: Vec<String> = Vec::new();
        for symbol in symbols {
            let symbol = normalize_symbol(symbol);
            if !missing.contains(&symbol) {
                missing.push(symbol);
            }
        }
        if missing.is_empty() {
            return Ok(quotes);
        }
        if self.providers.is_empty() {
            return Err(CoreError::ValidationError(
                "No quote provider registered".into(),
            ));
        }

        for provider in &self.providers {
            if missing.is_empty() {
                break;
            }
            match provider.get_quotes(&missing).await {
                Ok(found) => {
                    debug!(
                        "{} returned {} of {} requested quotes",
                        provider.name(),
                        found.len(),
                        missing.len()
                    );
                    for (symbol, quote) in found {
                        quotes.insert(normalize_symbol(&symbol), quote);
                    }
                    missing.retain(|s| !quotes.contains_key(s));
                }
                Err(e) => {
                    warn!("Quote provider {} failed: {e}", provider.name());
                }
            }
        }

        if !missing.is_empty() {
            warn!("No quote available for: {}", missing.join(", "));
        }
        Ok(quotes)
    }

    /// The price lookup consumed by the holdings and watchlist calculations.
    pub async fn fetch_current_prices(&self, symbols: &[String]) -> Result<CurrentPrices, CoreError> {
        let quotes = self.fetch_quotes(symbols).await?;
        Ok(to_current_prices(quotes.values()))
    }
}

impl Default for QuoteService {
    fn default() -> Self {
        Self::new()
    }
}
