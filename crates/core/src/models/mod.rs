pub mod analytics;
pub mod holding;
pub mod ledger;
pub mod position;
pub mod quote;
pub mod settings;
pub mod transaction;
pub mod watchlist;
