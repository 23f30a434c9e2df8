pub mod analytics_service;
pub mod holdings_service;
pub mod performance;
pub mod quote_service;
pub mod watchlist_service;
