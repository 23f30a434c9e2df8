use chrono::NaiveDate;
use log::debug;

use crate::models::quote::{normalize_symbol, CurrentPrices, PriceData};
use crate::models::watchlist::WatchlistItem;
use crate::services::performance::{annualized_gain, days_between, percent_of};

/// Values watchlist items as if one unit had been bought when each was added.
pub struct WatchlistService;

impl WatchlistService {
    pub fn new() -> Self {
        Self
    }

    /// Return the items with their derived fields recomputed from `prices`.
    ///
    /// Same length and order as the input. Items without a quote are returned
    /// exactly as passed in. Calling this repeatedly with the same prices
    /// gives the same result.
    pub fn enrich(
        &self,
        items: &[WatchlistItem],
        prices: &CurrentPrices,
        as_of: NaiveDate,
    ) -> Vec<WatchlistItem> {
        let enriched: Vec<WatchlistItem> = items
            .iter()
            .map(|item| match prices.get(&normalize_symbol(&item.symbol)) {
                Some(price) => Self::apply_price(item, price, as_of),
                None => item.clone(),
            })
            .collect();

        debug!(
            "Enriched {} of {} watchlist items",
            items
                .iter()
                .filter(|i| prices.contains_key(&normalize_symbol(&i.symbol)))
                .count(),
            items.len()
        );
        enriched
    }

    fn apply_price(item: &WatchlistItem, price: &PriceData, as_of: NaiveDate) -> WatchlistItem {
        let gain_since_added = price.price - item.price_when_added;
        let day_gain = price.price - price.previous_close;
        let days = days_between(item.date_added, as_of);

        WatchlistItem {
            symbol: normalize_symbol(&item.symbol),
            current_price: price.price,
            gain_since_added,
            gain_since_added_percent: percent_of(gain_since_added, item.price_when_added),
            day_gain,
            day_gain_percent: percent_of(day_gain, price.previous_close),
            annualized_gain_percent: annualized_gain(item.price_when_added, price.price, days),
            ..item.clone()
        }
    }
}

impl Default for WatchlistService {
    fn default() -> Self {
        Self::new()
    }
}
