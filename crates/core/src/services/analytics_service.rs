use crate::models::analytics::PortfolioSummary;
use crate::models::holding::Holding;
use crate::services::performance::percent_of;

/// Computes portfolio-wide totals from a holdings snapshot.
///
/// Stateless: every call starts from zero, so the same holdings always
/// give the same summary.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Reduce holdings into a [`PortfolioSummary`].
    ///
    /// An empty slice gives an all-zero summary. The day gain percentage is
    /// measured against the portfolio's value at the previous close
    /// (`total_value - total_day_gain`), and the annualized gain is the
    /// holdings' annualized gains weighted by current value.
    pub fn summarize(&self, holdings: &[Holding]) -> PortfolioSummary {
        let mut summary = PortfolioSummary::default();

        for holding in holdings {
            summary.total_value += holding.current_value;
            summary.total_book_cost += holding.book_cost;
            summary.total_gain += holding.gain;
            summary.total_day_gain += holding.day_gain;
        }

        summary.total_gain_percent = percent_of(summary.total_gain, summary.total_book_cost);

        let opening_value = summary.total_value - summary.total_day_gain;
        summary.total_day_gain_percent = percent_of(summary.total_day_gain, opening_value);

        if summary.total_value > 0.0 {
            summary.annualized_gain_percent = holdings
                .iter()
                .map(|h| h.annualized_gain_percent * (h.current_value / summary.total_value))
                .sum();
        }

        summary
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
