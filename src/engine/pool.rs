use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::errors::StateError;
use super::math::get_share;
use crate::model::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PoolStatus {
    Staged,
    Available,
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolStatus::Staged => write!(f, "Staged"),
            PoolStatus::Available => write!(f, "Available"),
        }
    }
}

/// A liquidity provider's position in a single pool.
///
/// `fetch_address` is the key the provider is looked up by. It is resolved
/// from whichever of `rune_address`/`asset_address` the inbound tx supplied
/// (RUNE side wins when both are known) — see [`resolve_fetch_address`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LiquidityProvider {
    pub fetch_address: Option<String>,
    pub units: i64,
    pub pending_rune: i64,
    pub pending_asset: i64,
    pub pending_tx: Option<String>,
    pub rune_deposit_value: i64,
    pub asset_deposit_value: i64,
    pub rune_address: Option<String>,
    pub asset_address: Option<String>,
}

impl LiquidityProvider {
    pub fn new(fetch_address: Option<String>) -> Self {
        Self { fetch_address, ..Default::default() }
    }

    pub fn is_zero(&self) -> bool {
        self.units <= 0
    }
}

/// Resolves the address an LP record is keyed by from the rune/asset
/// addresses an inbound `ADD:` tx supplied. Faithful to the reference
/// node: a rune address of exactly `Some("")` falls back to the asset
/// address; any other rune address (including `None`) wins outright.
pub fn resolve_fetch_address(
    rune_address: &Option<String>,
    asset_address: &Option<String>,
) -> Option<String> {
    match rune_address {
        Some(s) if s.is_empty() => asset_address.clone(),
        _ => rune_address.clone(),
    }
}

/// A constant-product market between RUNE and a single asset, plus its
/// liquidity providers.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Pool {
    pub asset: Asset,
    pub rune_balance: i64,
    pub asset_balance: i64,
    pub synth_balance: i64,
    pub lp_units: i64,
    pub liquidity_providers: Vec<LiquidityProvider>,
    pub status: PoolStatus,
}

impl Pool {
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            rune_balance: 0,
            asset_balance: 0,
            synth_balance: 0,
            lp_units: 0,
            liquidity_providers: Vec::new(),
            status: PoolStatus::Available,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.rune_balance == 0 && self.asset_balance == 0
    }

    pub fn add(&mut self, rune_amt: i64, asset_amt: i64) {
        self.rune_balance += rune_amt;
        self.asset_balance += asset_amt;
    }

    pub fn sub(&mut self, rune_amt: i64, asset_amt: i64) -> Result<(), StateError> {
        self.rune_balance -= rune_amt;
        self.asset_balance -= asset_amt;
        if self.rune_balance < 0 || self.asset_balance < 0 {
            return Err(StateError::PoolUnderflow {
                asset: self.asset.to_string(),
                rune: self.rune_balance,
                asset_amt: self.asset_balance,
            });
        }
        Ok(())
    }

    /// `(L*S)/(2*A-S)`, denominator floored at 1.
    pub fn synth_units(&self) -> i64 {
        if self.asset_balance == 0 {
            return 0;
        }
        let numerator = self.lp_units as i128 * self.synth_balance as i128;
        let denominator = (2 * self.asset_balance as i128 - self.synth_balance as i128).max(1);
        (numerator / denominator) as i64
    }

    pub fn pool_units(&self) -> i64 {
        self.synth_units() + self.lp_units
    }

    pub fn get_asset_in_rune(&self, val: i64) -> i64 {
        if self.is_zero() {
            return 0;
        }
        get_share(self.asset_balance, self.rune_balance, val)
    }

    pub fn get_rune_in_asset(&self, val: i64) -> i64 {
        if self.is_zero() {
            return 0;
        }
        let amount = get_share(self.rune_balance, self.asset_balance, val);
        if self.asset.is_gaia() { (amount / 100) * 100 } else { amount }
    }

    /// Rune equivalent of an asset amount added to the pool, taking slip
    /// into account: when this amount is later withdrawn, the constant
    /// product of depths is preserved.
    pub fn get_rune_disbursement_for_asset_add(&self, val: i64) -> i64 {
        if self.is_zero() {
            return 0;
        }
        get_share(self.rune_balance, self.asset_balance + val, val)
    }

    pub fn get_liquidity_provider(&self, address: &Option<String>) -> LiquidityProvider {
        self.liquidity_providers
            .iter()
            .find(|lp| &lp.fetch_address == address)
            .cloned()
            .unwrap_or_else(|| LiquidityProvider::new(address.clone()))
    }

    pub fn set_liquidity_provider(&mut self, lp: LiquidityProvider) {
        if let Some(existing) = self
            .liquidity_providers
            .iter_mut()
            .find(|l| l.fetch_address == lp.fetch_address)
        {
            *existing = lp;
        } else {
            self.liquidity_providers.push(lp);
        }
    }

    /// Adds rune/asset liquidity for a provider. Returns `(units_minted,
    /// rune_credited, asset_credited, pending_tx)`. One-sided deposits are
    /// parked in `pending_rune`/`pending_asset` until the other side
    /// arrives, signaled by `units_minted == 0`.
    pub fn add_liquidity(
        &mut self,
        rune_address: Option<String>,
        asset_address: Option<String>,
        rune_amt: i64,
        asset_amt: i64,
        txid: &str,
    ) -> (i64, i64, i64, Option<String>) {
        let fetch_address = resolve_fetch_address(&rune_address, &asset_address);
        let mut lp = self.get_liquidity_provider(&fetch_address);

        if rune_address.is_some() {
            lp.rune_address = rune_address.clone();
        }
        if asset_address.is_some() {
            lp.asset_address = asset_address.clone();
        }

        let asset_amt = asset_amt + lp.pending_asset;
        let rune_amt = rune_amt + lp.pending_rune;

        if asset_amt == 0 && asset_address.is_some() {
            lp.pending_rune += rune_amt;
            lp.pending_tx = Some(txid.to_string());
            let pending_tx = lp.pending_tx.clone();
            self.set_liquidity_provider(lp);
            return (0, 0, 0, pending_tx);
        }
        if rune_amt == 0 && rune_address.is_some() {
            lp.pending_asset += asset_amt;
            lp.pending_tx = Some(txid.to_string());
            let pending_tx = lp.pending_tx.clone();
            self.set_liquidity_provider(lp);
            return (0, 0, 0, pending_tx);
        }

        lp.pending_rune = 0;
        lp.pending_asset = 0;

        let units = calc_liquidity_units(self.rune_balance, self.asset_balance, self.pool_units(), rune_amt, asset_amt);

        self.add(rune_amt, asset_amt);
        self.lp_units += units;
        lp.units += units;
        lp.rune_deposit_value += get_share(units, self.lp_units, self.rune_balance);
        lp.asset_deposit_value += get_share(units, self.lp_units, self.asset_balance);
        let pending_tx = lp.pending_tx.clone();
        self.set_liquidity_provider(lp);

        (units, rune_amt, asset_amt, pending_tx)
    }

    /// Withdraws `bps` (0..=10000) basis points of `address`'s pool share.
    /// Returns `(units_removed, rune_out, asset_out)`.
    pub fn withdraw(&mut self, address: &Option<String>, bps: i64) -> Result<(i64, i64, i64), StateError> {
        if !(0..=10000).contains(&bps) {
            return Err(StateError::InvalidBasisPoints(bps));
        }

        let lp = self.get_liquidity_provider(address);
        let units_to_claim = get_share(bps, 10000, lp.units);
        let withdraw_rune = get_share(units_to_claim, self.pool_units(), self.rune_balance);
        let mut withdraw_asset = get_share(units_to_claim, self.pool_units(), self.asset_balance);
        if self.asset.is_gaia() {
            withdraw_asset = (withdraw_asset / 100) * 100;
        }

        if lp.units - units_to_claim < 0 {
            return Err(StateError::LiquidityUnderflow {
                address: address.clone().unwrap_or_default(),
                units: lp.units - units_to_claim,
            });
        }

        let mut lp = lp;
        lp.units -= units_to_claim;
        lp.rune_deposit_value -= get_share(units_to_claim, self.lp_units, self.rune_balance);
        lp.asset_deposit_value -= get_share(units_to_claim, self.lp_units, self.asset_balance);
        self.set_liquidity_provider(lp);

        self.lp_units -= units_to_claim;
        self.sub(withdraw_rune, withdraw_asset)?;

        Ok((units_to_claim, withdraw_rune, withdraw_asset))
    }
}

/// `P * (r*A + a*R + 2*r*a) / (r*A + a*R + 2*R*A)`, bootstrap `units = r`
/// when the pool has no prior depth or units.
fn calc_liquidity_units(rune_balance: i64, asset_balance: i64, pool_units: i64, r: i64, a: i64) -> i64 {
    if rune_balance == 0 || asset_balance == 0 || pool_units == 0 {
        return r;
    }
    let (rr, aa, rrb, aab, pp) =
        (r as i128, a as i128, rune_balance as i128, asset_balance as i128, pool_units as i128);
    let numerator = pp * (rr * aab + aa * rrb + 2 * rr * aa);
    let denominator = rr * aab + aa * rrb + 2 * rrb * aab;
    if denominator == 0 {
        return r;
    }
    (numerator / denominator) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bnb() -> Asset {
        Asset::parse("BNB.BNB")
    }

    #[test]
    fn symmetric_add_liquidity_mints_the_bootstrap_units() {
        let mut pool = Pool::new(bnb());
        let (units, rune, asset, pending) = pool.add_liquidity(
            Some("rune_addr".into()),
            Some("asset_addr".into()),
            500_0000_0000,
            1_5000_0000,
            "tx1",
        );
        assert_eq!(units, 500_0000_0000);
        assert_eq!(rune, 500_0000_0000);
        assert_eq!(asset, 1_5000_0000);
        assert!(pending.is_none());
        assert_eq!(pool.lp_units, 500_0000_0000);
        assert_eq!(pool.rune_balance, 500_0000_0000);
        assert_eq!(pool.asset_balance, 1_5000_0000);
    }

    #[test]
    fn one_sided_deposit_is_pending_until_the_other_side_arrives() {
        let mut pool = Pool::new(bnb());
        let (units, _, _, pending) =
            pool.add_liquidity(None, Some("asset_addr".into()), 0, 1_0000_0000, "tx1");
        assert_eq!(units, 0);
        assert!(pending.is_some());
        assert_eq!(pool.lp_units, 0);

        let (units2, rune2, asset2, _) =
            pool.add_liquidity(Some("rune_addr".into()), None, 200_0000_0000, 0, "tx2");
        assert!(units2 > 0);
        assert_eq!(asset2, 1_0000_0000);
        assert_eq!(rune2, 200_0000_0000);
    }

    #[test]
    fn full_withdraw_drains_units_to_zero() {
        let mut pool = Pool::new(bnb());
        pool.add_liquidity(Some("p1".into()), Some("p1".into()), 100_0000_0000, 10_0000_0000, "tx1");
        let addr = Some("p1".to_string());
        let (units, rune_out, asset_out) = pool.withdraw(&addr, 10000).unwrap();
        assert_eq!(units, 100_0000_0000);
        assert_eq!(rune_out, 100_0000_0000);
        assert_eq!(asset_out, 10_0000_0000);
        assert_eq!(pool.lp_units, 0);
        assert_eq!(pool.rune_balance, 0);
        assert_eq!(pool.asset_balance, 0);
    }

    #[test]
    fn withdraw_rejects_out_of_range_basis_points() {
        let mut pool = Pool::new(bnb());
        pool.add_liquidity(Some("p1".into()), Some("p1".into()), 100, 100, "tx1");
        let addr = Some("p1".to_string());
        assert!(pool.withdraw(&addr, 10001).is_err());
        assert!(pool.withdraw(&addr, -1).is_err());
    }

    #[test]
    fn sub_below_zero_is_a_fatal_pool_underflow() {
        let mut pool = Pool::new(bnb());
        pool.add(100, 100);
        assert!(pool.sub(200, 0).is_err());
    }

    #[test]
    fn synth_units_denominator_floors_at_one() {
        let mut pool = Pool::new(bnb());
        pool.add(100, 50);
        pool.lp_units = 1000;
        pool.synth_balance = 100; // 2*50 - 100 == 0, denominator floors to 1
        assert_eq!(pool.synth_units(), 1000 * 100);
    }
}
