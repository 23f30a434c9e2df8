//! Presentation helpers for monetary values and percentages.

use serde::{Deserialize, Serialize};

/// Sign of a gain, for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainDirection {
    Positive,
    Negative,
    Neutral,
}

impl GainDirection {
    pub fn of(value: f64) -> Self {
        if value > 0.0 {
            GainDirection::Positive
        } else if value < 0.0 {
            GainDirection::Negative
        } else {
            GainDirection::Neutral
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self {
            GainDirection::Positive => "positive",
            GainDirection::Negative => "negative",
            GainDirection::Neutral => "neutral",
        }
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    match code.to_uppercase().as_str() {
        "GBP" => Some("£"),
        "USD" => Some("$"),
        "EUR" => Some("€"),
        "JPY" => Some("¥"),
        _ => None,
    }
}

/// Two decimals with thousands separators, e.g. `£1,234.56` or `-£0.50`.
/// Unknown currency codes are written as a prefix: `CHF 12.00`.
pub fn format_currency(value: f64, currency: &str) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && rounded != "0.00" { "-" } else { "" };
    match currency_symbol(currency) {
        Some(symbol) => format!("{sign}{symbol}{grouped}.{fraction}"),
        None => format!("{sign}{} {grouped}.{fraction}", currency.to_uppercase()),
    }
}

/// Signed percentage with two decimals, e.g. `+12.34%` or `-0.50%`.
pub fn format_percent(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}
