use chrono::NaiveDate;
use log::warn;

/// Length of an average year, leap years included.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Whole days between two dates, regardless of order.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days().abs()
}

/// Compound annual growth rate (in percent) implied by moving from
/// `initial_value` to `current_value` over `elapsed_days`.
///
/// - Zero elapsed days or a zero initial value yields 0.
/// - A total loss or worse (growth factor ≤ 0) saturates at -100.
/// - A result that overflows `f64` (huge return over a tiny horizon) yields 0.
pub fn annualized_gain(initial_value: f64, current_value: f64, elapsed_days: i64) -> f64 {
    if elapsed_days == 0 || initial_value == 0.0 {
        return 0.0;
    }

    let years = elapsed_days.unsigned_abs() as f64 / DAYS_PER_YEAR;
    let total_return = (current_value - initial_value) / initial_value;
    let growth = 1.0 + total_return;

    if growth <= 0.0 {
        return -100.0;
    }

    let annualized = (growth.powf(1.0 / years) - 1.0) * 100.0;
    if annualized.is_finite() {
        annualized
    } else {
        warn!(
            "Annualized gain for {initial_value} -> {current_value} over {elapsed_days} days is not finite; reporting 0"
        );
        0.0
    }
}

/// `numerator / denominator * 100`, or 0 when the denominator is not positive.
pub(crate) fn percent_of(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}
