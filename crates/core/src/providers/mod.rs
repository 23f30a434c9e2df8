pub mod traits;

// API client implementations
pub mod google_sheets;
pub mod twelve_data;
