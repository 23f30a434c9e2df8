use serde::{Deserialize, Serialize};

/// How a SELL relieves cost basis from a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LotMethod {
    /// Book cost is reduced in proportion to the fraction of units sold.
    #[default]
    AverageCost,
    /// Oldest open lots (in transaction order) are sold first.
    Fifo,
    /// Newest open lots are sold first.
    Lifo,
}

/// What to do with a SELL for more units than are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OversellPolicy {
    /// Close the position entirely and report the oversell.
    #[default]
    Liquidate,
    /// Leave the position untouched and report the oversell.
    Reject,
}

/// User-configurable settings for the tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Currency code used when formatting monetary values (e.g., "GBP").
    pub currency: String,

    /// Cost basis relief method for sells.
    #[serde(default)]
    pub lot_method: LotMethod,

    /// Handling of sells that exceed the held quantity.
    #[serde(default)]
    pub oversell_policy: OversellPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: "GBP".to_string(),
            lot_method: LotMethod::default(),
            oversell_policy: OversellPolicy::default(),
        }
    }
}
