use crate::model::{Asset, Coin, Event, Transaction};

use super::errors::StateError;
use super::math::get_share;
use super::state::ThorchainState;

impl ThorchainState {
    /// Linear interpolation of the outbound fee multiplier between its
    /// configured min/max bounds, driven by the gas surplus
    /// `s = gas_withheld_rune - gas_spent_rune`: at `s <= 0` the network has
    /// withheld no more than it has spent and charges the max multiplier; at
    /// `s >= target_surplus` it has withheld a full surplus and charges the
    /// min.
    pub fn calc_outbound_fee_multiplier(&self) -> i64 {
        let c = &self.constants;
        let surplus = self.gas_withheld_rune - self.gas_spent_rune;
        if surplus <= 0 {
            return c.outbound_fee_multiplier_max_bps;
        }
        if surplus >= c.target_surplus {
            return c.outbound_fee_multiplier_min_bps;
        }
        let share = get_share(surplus, c.target_surplus, c.outbound_fee_multiplier_max_bps - c.outbound_fee_multiplier_min_bps);
        c.outbound_fee_multiplier_max_bps - share
    }

    /// The RUNE-denominated fee charged on a native-THOR outbound, scaled by
    /// the current outbound fee multiplier.
    pub fn get_rune_fee(&self) -> i64 {
        get_share(self.calc_outbound_fee_multiplier(), 10_000, self.constants.rune_fee)
    }

    /// The RUNE-denominated fee an outbound on `chain` must clear, used by
    /// `handle_swap`'s "not enough fee" guards. Falls back to the flat
    /// `rune_fee` constant when `chain` has no tracked network fee, its fee
    /// is zero, or its gas-asset pool is empty — the same fallback the
    /// reference node applies before it has anything to convert through.
    pub fn rune_fee_for_chain(&self, chain: &str) -> i64 {
        let Some(&chain_fee) = self.network_fees.get(chain) else {
            return self.constants.rune_fee;
        };
        if chain_fee == 0 {
            return self.constants.rune_fee;
        }
        let Some(gas_asset) = self.get_gas_asset(chain) else {
            return self.constants.rune_fee;
        };
        let pool = self.get_pool(&gas_asset);
        if pool.asset_balance == 0 || pool.rune_balance == 0 {
            return self.constants.rune_fee;
        }
        let multiplier = self.calc_outbound_fee_multiplier();
        let mut fee = get_share(multiplier, 10_000, chain_fee);
        if gas_asset.is_gaia() {
            fee = (fee / 100) * 100;
        }
        pool.get_asset_in_rune(fee)
    }

    /// The asset-denominated fee for a non-RUNE outbound of `asset`: the
    /// chain's flat network fee when `asset` is that chain's own gas asset,
    /// otherwise the RUNE fee converted through `asset`'s own pool (e.g. a
    /// BEP-2 token or ERC-20 sharing a chain with, but distinct from, its
    /// gas asset).
    pub fn get_asset_fee(&self, asset: &Asset) -> i64 {
        let multiplier = self.calc_outbound_fee_multiplier();
        let chain = asset.settlement_chain();
        let is_gas_asset = self.get_gas_asset(chain).as_ref() == Some(&asset.to_layer1());
        if is_gas_asset {
            if let Some(network_fee) = self.network_fees.get(chain) {
                return get_share(multiplier, 10_000, *network_fee);
            }
        }
        let rune_fee = get_share(multiplier, 10_000, self.constants.rune_fee);
        self.get_pool(asset).get_rune_in_asset(rune_fee)
    }

    /// Deducts network fees from every outbound, converting the fee into
    /// RUNE via the relevant pool and crediting the reserve. Drops any
    /// outbound whose coin can't cover its own fee. Mutates no pool until
    /// every fee has been computed, so a fatal pool underflow here always
    /// means a genuine accounting bug rather than an ordering artifact.
    pub fn handle_fee(&mut self, in_tx: &Transaction, txs: Vec<Transaction>) -> Result<Vec<Transaction>, StateError> {
        let mut surviving = Vec::new();

        for mut tx in txs {
            let Some(coin) = tx.coins.first().cloned() else {
                continue;
            };

            if coin.is_rune() {
                let fee = coin.amount.min(self.constants.rune_fee);
                let remainder = coin.amount - fee;
                self.reserve += fee;
                if remainder <= 0 {
                    self.push_fee_event(in_tx, &tx, &coin.asset, fee, 0);
                    continue;
                }
                tx.coins[0].amount = remainder;
                tx.fee = Some(crate::model::Coin::new(coin.asset.clone(), fee));
                self.push_fee_event(in_tx, &tx, &coin.asset, fee, 0);
                surviving.push(tx);
                continue;
            }

            let chain = coin.asset.settlement_chain().to_string();
            let pool = self.get_pool(&coin.asset);
            if pool.status == super::pool::PoolStatus::Staged {
                surviving.push(tx);
                continue;
            }

            let asset_fee = self.get_asset_fee(&coin.asset);
            if coin.amount <= asset_fee {
                continue;
            }

            let rune_fee = pool.get_rune_disbursement_for_asset_add(asset_fee).min(pool.rune_balance);

            let mut pool = pool;
            if coin.asset.is_synth() {
                pool.synth_balance -= asset_fee;
                self.push_mint_burn_event(&coin.asset, "burn", asset_fee, "swap_fee");
            } else {
                pool.add(0, asset_fee);
            }
            pool.sub(rune_fee, 0)?;
            self.reserve += rune_fee;
            // The fee just taken was withheld from the user specifically to
            // cover this outbound's future on-chain gas; tracked separately
            // from `gas_spent_rune` so the surplus/deficit between the two
            // drives the outbound fee multiplier (see `calc_outbound_fee_multiplier`).
            self.gas_withheld_rune += rune_fee;
            self.set_pool(pool);

            tx.coins[0].amount = coin.amount - asset_fee;
            self.push_fee_event(in_tx, &tx, &coin.asset, asset_fee, rune_fee);

            tx = self.apply_max_gas(tx, &chain);
            surviving.push(tx);
        }

        Ok(surviving)
    }

    fn push_fee_event(&mut self, in_tx: &Transaction, out_tx: &Transaction, asset: &Asset, fee: i64, pool_deduct: i64) {
        self.events.push(Event::new(
            "fee",
            vec![
                ("tx_id".to_string(), out_tx.id.clone()),
                ("coins".to_string(), format!("{} {}", fee, asset)),
                ("pool_deduct".to_string(), pool_deduct.to_string()),
                ("in_tx_id".to_string(), in_tx.id.clone()),
            ],
        ));
    }

    fn push_mint_burn_event(&mut self, asset: &Asset, supply: &str, amount: i64, reason: &str) {
        self.events.push(Event::new(
            "mint_burn",
            vec![
                ("supply".to_string(), supply.to_string()),
                ("denom".to_string(), asset.to_string().to_lowercase()),
                ("amount".to_string(), amount.to_string()),
                ("reason".to_string(), reason.to_string()),
            ],
        ));
    }

    /// Folds a gas-asset outbound's amount down to the chain's UTXO-style
    /// `max_gas` reserve when the remaining balance would otherwise be dust
    /// the chain adapter can't actually spend.
    fn apply_max_gas(&self, mut tx: Transaction, chain: &str) -> Transaction {
        let max_gas = self.get_max_gas(chain);
        tx = tx.with_max_gas(vec![max_gas]);
        tx
    }

    /// Accounts for the gas chain adapters actually spend broadcasting a
    /// batch of outbounds: debits the reserve, credits the relevant pool
    /// with RUNE, and debits the pool's asset balance by the gas spent.
    pub fn handle_gas(&mut self, outbounds: &[Transaction]) -> Result<(), StateError> {
        use std::collections::HashMap;

        let mut gas_by_asset: HashMap<Asset, i64> = HashMap::new();
        for tx in outbounds {
            let coins = if matches!(tx.chain.as_str(), "BTC" | "BCH" | "LTC" | "DOGE") {
                tx.max_gas.clone().or_else(|| tx.gas.clone())
            } else {
                tx.gas.clone()
            };
            for coin in coins.unwrap_or_default() {
                *gas_by_asset.entry(coin.asset.clone()).or_insert(0) += coin.amount;
            }
        }

        for (asset, amount) in gas_by_asset {
            if asset.settlement_chain() == crate::model::RUNE_CHAIN {
                continue;
            }
            let pool = self.get_pool(&asset);
            let rune_amt = pool.get_asset_in_rune(amount);
            let mut pool = pool;
            pool.sub(0, amount)?;
            pool.add(rune_amt, 0);
            self.reserve -= rune_amt;
            self.gas_spent_rune += rune_amt;
            self.set_pool(pool);

            self.events.push(Event::new(
                "gas",
                vec![
                    ("asset".to_string(), asset.to_string()),
                    ("asset_amt".to_string(), amount.to_string()),
                    ("rune_amt".to_string(), rune_amt.to_string()),
                    ("transaction_count".to_string(), "1".to_string()),
                ],
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coin;

    #[test]
    fn rune_fee_is_capped_at_the_coin_amount() {
        let mut state = ThorchainState::default();
        let in_tx = Transaction::new("THOR", "a", "VAULT", vec![Coin::new(Asset::rune(), 10)], "SWAP:BNB.BNB");
        let out = Transaction::new("THOR", "VAULT", "a", vec![Coin::new(Asset::rune(), 10)], "OUT:x");
        let result = state.handle_fee(&in_tx, vec![out]).unwrap();
        assert!(result.is_empty());
        assert_eq!(state.reserve, 10);
    }

    #[test]
    fn asset_fee_for_a_non_gas_token_converts_through_its_own_pool() {
        let mut state = ThorchainState::default();
        state.set_network_fees(std::collections::HashMap::from([("BNB".to_string(), 37_500i64)]));

        let mut gas_pool = state.get_pool(&Asset::parse("BNB.BNB"));
        gas_pool.add(50_0000_0000, 50_0000_0000);
        state.pools.push(gas_pool);

        let token = Asset::parse("BNB.LOK-3C0");
        let mut token_pool = state.get_pool(&token);
        token_pool.add(10_0000_0000, 1000_0000_0000);
        state.pools.push(token_pool);

        let gas_fee = state.get_asset_fee(&Asset::parse("BNB.BNB"));
        assert_eq!(gas_fee, 75_000, "the chain's own gas asset still uses the flat network fee");

        let token_fee = state.get_asset_fee(&token);
        assert_ne!(token_fee, gas_fee, "a non-gas token must not reuse the gas asset's flat fee");

        let rune_fee = get_share(20_000, 10_000, state.constants.rune_fee);
        let expected = state.get_pool(&token).get_rune_in_asset(rune_fee);
        assert_eq!(token_fee, expected);
    }

    #[test]
    fn staged_pool_outbound_passes_through_fee_free() {
        let mut state = ThorchainState::default();
        let asset = Asset::parse("BNB.BNB");
        // freshly-created pool defaults to Available with zero depth; force it
        // into Staged the way `set_pool` would after a depth hits zero.
        let mut pool = state.get_pool(&asset);
        pool.status = super::super::pool::PoolStatus::Staged;
        state.pools.push(pool);

        let in_tx = Transaction::new("BNB", "a", "VAULT", vec![], "SWAP:RUNE");
        let out = Transaction::new("BNB", "VAULT", "a", vec![Coin::new(asset, 100)], "OUT:x");
        let result = state.handle_fee(&in_tx, vec![out]).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].coins[0].amount, 100);
    }
}
