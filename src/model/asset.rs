use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::RUNE_CHAIN;

/// A chain-qualified asset identifier, e.g. `BNB.BNB` or the synth form `BTC/BTC`.
///
/// Layer-1 assets are written `CHAIN.SYMBOL`; synths are written `CHAIN/SYMBOL`
/// and always settle on the native chain regardless of the chain named in
/// their identifier.
#[derive(Debug, Clone, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    pub chain: String,
    pub symbol: String,
    pub synth: bool,
}

impl Asset {
    pub fn new(chain: impl Into<String>, symbol: impl Into<String>, synth: bool) -> Self {
        Self { chain: chain.into(), symbol: symbol.into(), synth }
    }

    pub fn rune() -> Self {
        Asset::new(RUNE_CHAIN, "RUNE", false)
    }

    /// Parse `CHAIN.SYMBOL`, `CHAIN/SYMBOL`, or a bare `SYMBOL` (defaults chain to THOR).
    pub fn parse(s: &str) -> Self {
        if let Some((chain, symbol)) = s.split_once('/') {
            return Asset::new(chain, symbol, true);
        }
        if let Some((chain, symbol)) = s.split_once('.') {
            return Asset::new(chain, symbol, false);
        }
        Asset::new(RUNE_CHAIN, s, false)
    }

    pub fn ticker(&self) -> &str {
        self.symbol.split('-').next().unwrap_or(&self.symbol)
    }

    /// The chain that actually settles this asset: the native chain for synths,
    /// `self.chain` otherwise.
    pub fn settlement_chain(&self) -> &str {
        if self.synth { RUNE_CHAIN } else { &self.chain }
    }

    pub fn is_rune(&self) -> bool {
        self.ticker().eq_ignore_ascii_case("RUNE")
    }

    pub fn is_thor(&self) -> bool {
        self.chain.eq_ignore_ascii_case(RUNE_CHAIN)
    }

    pub fn is_gaia(&self) -> bool {
        self.chain.eq_ignore_ascii_case("GAIA")
    }

    pub fn is_bnb(&self) -> bool {
        self.ticker().eq_ignore_ascii_case("BNB") && self.chain.eq_ignore_ascii_case("BNB")
    }

    pub fn is_btc(&self) -> bool {
        self.chain.eq_ignore_ascii_case("BTC")
    }

    pub fn is_bch(&self) -> bool {
        self.chain.eq_ignore_ascii_case("BCH")
    }

    pub fn is_ltc(&self) -> bool {
        self.chain.eq_ignore_ascii_case("LTC")
    }

    pub fn is_doge(&self) -> bool {
        self.chain.eq_ignore_ascii_case("DOGE")
    }

    /// Is this the ETH chain's native gas coin (as opposed to an ERC20 token
    /// that merely lives on the ETH chain)?
    pub fn is_eth(&self) -> bool {
        self.chain.eq_ignore_ascii_case("ETH") && self.ticker().eq_ignore_ascii_case("ETH")
    }

    /// An ERC20: lives on the ETH chain but is not the chain's gas asset.
    pub fn is_erc20(&self) -> bool {
        self.chain.eq_ignore_ascii_case("ETH") && !self.ticker().eq_ignore_ascii_case("ETH")
    }

    pub fn is_synth(&self) -> bool {
        self.synth
    }

    pub fn to_synth(&self) -> Asset {
        Asset::new(self.chain.clone(), self.symbol.clone(), true)
    }

    pub fn to_layer1(&self) -> Asset {
        Asset::new(self.chain.clone(), self.symbol.clone(), false)
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.chain.eq_ignore_ascii_case(&other.chain)
            && self.symbol.eq_ignore_ascii_case(&other.symbol)
            && self.synth == other.synth
    }
}

impl std::hash::Hash for Asset {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.chain.to_ascii_uppercase().hash(state);
        self.symbol.to_ascii_uppercase().hash(state);
        self.synth.hash(state);
    }
}

impl FromStr for Asset {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Asset::parse(s))
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.synth { '/' } else { '.' };
        write!(f, "{}{sep}{}", self.chain, self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layer1() {
        let a = Asset::parse("BNB.BNB");
        assert_eq!(a.chain, "BNB");
        assert_eq!(a.symbol, "BNB");
        assert!(!a.synth);
    }

    #[test]
    fn parses_synth() {
        let a = Asset::parse("BTC/BTC");
        assert!(a.synth);
        assert!(a.is_btc());
    }

    #[test]
    fn bare_symbol_defaults_to_thor() {
        let a = Asset::parse("RUNE");
        assert_eq!(a.chain, "THOR");
        assert!(a.is_rune());
    }

    #[test]
    fn equality_is_case_insensitive() {
        assert_eq!(Asset::parse("bnb.bnb"), Asset::parse("BNB.BNB"));
    }

    #[test]
    fn display_round_trips() {
        let a = Asset::parse("ETH.USDT-0X123");
        assert_eq!(a.to_string(), "ETH.USDT-0X123");
        assert_eq!(a.ticker(), "USDT-0X123".split('-').next().unwrap());
    }
}
