use crate::model::Event;

use super::math::get_share;
use super::state::ThorchainState;

impl ThorchainState {
    fn total_provided_liquidity(&self) -> i64 {
        self.pools.iter().map(|p| p.rune_balance).sum()
    }

    /// Distributes one block's emission between bonders and liquidity
    /// providers, proportional to each pool's rune depth, then clears the
    /// per-pool swap-fee accumulator for the next block. A no-op if the
    /// reserve is dry or no pool holds any rune.
    pub fn handle_rewards(&mut self) {
        if self.reserve == 0 || self.total_provided_liquidity() == 0 {
            return;
        }

        let c = &self.constants;
        let block_rewards =
            super::math::round_half_away_from_zero(self.reserve as f64 / c.emission_curve as f64 / c.blocks_per_year as f64);

        let total_liquidity_fees: i64 = self.liquidity.values().sum();
        let system_income = block_rewards + total_liquidity_fees;

        let total_bonded = self.total_bonded;
        let total_provided_liquidity = self.total_provided_liquidity();
        // lp_split = round(system_income / ((bonded+liquidity)/bonded))
        //          = round(system_income * bonded / (bonded+liquidity))
        let lp_split = if total_provided_liquidity >= total_bonded {
            0
        } else {
            get_share(total_bonded, total_bonded + total_provided_liquidity, system_income)
        };

        let bond_reward = system_income - lp_split;
        let (pool_reward, lp_deficit) = if lp_split >= total_liquidity_fees {
            (lp_split - total_liquidity_fees, 0)
        } else {
            (0, total_liquidity_fees - lp_split)
        };

        if self.reserve < bond_reward + pool_reward {
            return;
        }

        self.bond_reward += bond_reward;
        self.reserve -= bond_reward;

        let mut attrs = vec![("bond_reward".to_string(), bond_reward.to_string())];

        if pool_reward > 0 && total_provided_liquidity > 0 {
            self.reserve -= pool_reward;
            for pool in self.pools.iter_mut() {
                if pool.rune_balance == 0 {
                    continue;
                }
                let share = get_share(pool.rune_balance, total_provided_liquidity, pool_reward);
                pool.rune_balance += share;
                attrs.push((pool.asset.to_string(), share.to_string()));
            }
        } else if lp_deficit > 0 && total_liquidity_fees > 0 {
            for pool in self.pools.iter_mut() {
                let fee = *self.liquidity.get(&pool.asset.to_string()).unwrap_or(&0);
                if fee == 0 {
                    continue;
                }
                let debit = get_share(fee, total_liquidity_fees, lp_deficit);
                pool.rune_balance -= debit;
                self.reserve += debit;
                attrs.push((pool.asset.to_string(), format!("-{debit}")));
            }
        }

        self.events.push(Event::new("rewards", attrs));
        self.liquidity.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::pool::Pool;
    use crate::model::Asset;

    #[test]
    fn dry_reserve_is_a_silent_no_op() {
        let mut state = ThorchainState::default();
        state.handle_rewards();
        assert!(state.events.is_empty());
    }

    #[test]
    fn liquidity_accumulator_clears_after_a_rewards_cycle() {
        let mut state = ThorchainState::default();
        let mut pool = Pool::new(Asset::parse("BNB.BNB"));
        pool.add(50_0000_0000, 50_0000_0000);
        state.pools.push(pool);
        state.reserve = 100_000_0000_0000;
        state.liquidity.insert("BNB.BNB".to_string(), 1_000_000);

        state.handle_rewards();

        assert!(state.liquidity.is_empty());
        assert!(state.events.iter().any(|e| e.event_type == "rewards"));
    }
}
