use std::cmp::Ordering;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Asset, ONE};

/// An amount of a single asset, denominated in base units (1 unit = 1e-8 asset,
/// except Cosmos-family chains which are truncated to multiples of 100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Coin {
    pub asset: Asset,
    pub amount: i64,
}

impl Coin {
    pub fn new(asset: Asset, amount: i64) -> Self {
        Self { asset, amount }
    }

    pub fn zero(asset: Asset) -> Self {
        Self::new(asset, 0)
    }

    pub fn is_rune(&self) -> bool {
        self.asset.is_rune()
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    /// Cosmos-family wire amount, truncated from 1e-8 to 1e-6 precision.
    pub fn cosmos_amount(&self) -> i64 {
        (self.amount / 100) * 100
    }
}

// Arithmetic between coins acts on amounts only, mirroring the reference
// implementation's `Coin.__add__`/`__sub__` (used for tallying, not for
// building new coins of a possibly-different asset).
impl std::ops::Add for &Coin {
    type Output = i64;
    fn add(self, other: &Coin) -> i64 {
        self.amount + other.amount
    }
}

impl std::ops::Sub for &Coin {
    type Output = i64;
    fn sub(self, other: &Coin) -> i64 {
        self.amount - other.amount
    }
}

impl PartialOrd for Coin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount.cmp(&other.amount)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8} {}", self.amount as f64 / ONE as f64, self.asset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmos_amount_truncates_to_hundreds() {
        let c = Coin::new(Asset::parse("GAIA.ATOM"), 1_234_567);
        assert_eq!(c.cosmos_amount(), 1_234_500);
    }

    #[test]
    fn ordering_is_by_amount_only() {
        let a = Coin::new(Asset::parse("BNB.BNB"), 10);
        let b = Coin::new(Asset::parse("BTC.BTC"), 20);
        assert!(a < b);
    }

    #[test]
    fn display_renders_eight_decimals() {
        let c = Coin::new(Asset::rune(), 100_000_000);
        assert_eq!(c.to_string(), "1.00000000 THOR.RUNE");
    }
}
