use crate::model::{Asset, Coin, Event, Transaction};

use super::errors::StateError;
use super::pool::Pool;
use super::state::ThorchainState;

impl ThorchainState {
    /// Applies a single swap leg to a *copy* of the relevant pool and
    /// returns `(updated_pool, emit_coin, liquidity_fee_in_rune, swap_slip_bps)`.
    /// The caller is responsible for `set_pool`-ing the result; this never
    /// mutates `self` so a price-limit rejection can discard it for free.
    pub fn swap(&self, coin: &Coin, target_asset: &Asset) -> (Pool, Coin, i64, i64) {
        let pool_asset = if coin.is_rune() { target_asset.to_layer1() } else { coin.asset.to_layer1() };
        let mut pool = self.get_pool(&pool_asset);

        let double = target_asset.is_synth() || coin.asset.is_synth();
        let (rune_depth, asset_depth) =
            if double { (pool.rune_balance * 2, pool.asset_balance * 2) } else { (pool.rune_balance, pool.asset_balance) };

        let (x, big_x, big_y) = if coin.is_rune() {
            (coin.amount, rune_depth, asset_depth)
        } else {
            (coin.amount, asset_depth, rune_depth)
        };

        let emit = super::math::calc_asset_emission(big_x, x, big_y);
        let liquidity_fee = super::math::calc_liquidity_fee(big_x, x, big_y);
        let slip = super::math::calc_swap_slip(big_x, x);

        let liquidity_fee_in_rune = if coin.is_rune() { pool.get_asset_in_rune(liquidity_fee) } else { liquidity_fee };

        let mut emit = emit;
        if target_asset.is_gaia() {
            emit = (emit / 100) * 100;
        }

        if emit == 0 {
            return (pool, Coin::zero(target_asset.clone()), 0, slip);
        }

        if coin.is_rune() {
            pool.add(coin.amount, 0);
            if target_asset.is_synth() {
                pool.synth_balance += emit;
            } else {
                let _ = pool.sub(0, emit);
            }
        } else {
            if coin.asset.is_synth() {
                pool.synth_balance -= coin.amount;
            } else {
                pool.add(0, coin.amount);
            }
            let _ = pool.sub(emit, 0);
        }

        (pool, Coin::new(target_asset.clone(), emit), liquidity_fee_in_rune, slip)
    }

    pub fn handle_swap(&mut self, tx: &Transaction) -> Result<Vec<Transaction>, StateError> {
        let parts: Vec<&str> = tx.memo.split(':').collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return self.refund(tx, 105, "memo can't be empty");
        }

        if tx.coins.len() != 1 {
            return self.refund(tx, 105, "not expecting multiple coins in a swap");
        }

        let source = tx.coins[0].asset.clone();
        let target = Asset::parse(parts[1]);
        if source == target {
            return self.refund(tx, 105, "swap from/to cannot be the same asset");
        }

        let (destination, target_trade) = match parts.get(2) {
            Some(addr) if !addr.is_empty() => {
                let trade = parts.get(3).and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
                (addr.to_string(), trade)
            }
            _ => (tx.from_address.clone(), 0),
        };

        if destination.is_empty() {
            return self.refund(tx, 105, "address format not supported: empty");
        }

        // A destination explicitly addressed at the THOR chain or a synth
        // wallet only makes sense when the swap actually lands there.
        if (destination.contains("thor") || destination.contains("SYNTH")) && !target.is_synth() && !target.is_rune() {
            return self.refund(tx, 105, &format!("{destination} is not recognizable"));
        }

        let rune_fee = self.rune_fee_for_chain(target.settlement_chain());
        if tx.coins[0].is_rune() && tx.coins[0].amount <= rune_fee {
            return self.refund(tx, 108, "fail swap, not enough fee");
        }

        let mut in_tx = tx.clone();
        let mut coin = tx.coins[0].clone();

        // A non-RUNE-to-non-RUNE swap routes through RUNE as an intermediate
        // leg. The live node emits a synthetic `outbound` for this leg using
        // the all-zero tx id, since no real chain transaction carries it.
        if !coin.is_rune() && !target.is_rune() {
            if self.get_pool(&coin.asset).is_zero() {
                return self.refund(tx, 108, &format!("{} pool doesn't exist", coin.asset.to_layer1()));
            }
            let (pool, emit, fee_rune, slip) = self.swap(&coin, &Asset::rune());
            if emit.amount <= rune_fee {
                return self.refund(tx, 108, "fail swap, not enough fee");
            }
            self.set_pool(pool);
            *self.liquidity.entry(coin.asset.to_string()).or_insert(0) += fee_rune;

            let mut leg_tx = in_tx.clone().with_id(Transaction::EMPTY_ID);
            leg_tx.gas = None;
            // The live node emits (swap, outbound, swap) for a double swap: the
            // fake intermediate outbound sits between the two swap events.
            self.push_swap_event(&in_tx, &coin, &emit, slip, fee_rune, &pool_status_str(&self.get_pool(&coin.asset)));
            self.events.push(Event::new(
                "outbound",
                vec![
                    ("in_tx_id".to_string(), in_tx.id.clone()),
                    ("id".to_string(), Transaction::EMPTY_ID.to_string()),
                    ("chain".to_string(), leg_tx.chain.clone()),
                    ("from".to_string(), leg_tx.from_address.clone()),
                    ("to".to_string(), leg_tx.to_address.clone()),
                    ("coin".to_string(), format!("{} {}", emit.amount, emit.asset)),
                    ("memo".to_string(), format!("SWAP:{}:{}", target, destination)),
                ],
            ));

            in_tx = leg_tx;
            coin = emit;
        }

        let relevant_pool_asset = if coin.is_rune() { target.to_layer1() } else { coin.asset.to_layer1() };
        if self.get_pool(&relevant_pool_asset).rune_balance == 0 {
            return self.refund(tx, 108, &format!("{} pool doesn't exist", relevant_pool_asset));
        }

        let (pool, emit, fee_rune, slip) = self.swap(&coin, &target);

        if target.is_rune() && emit.amount <= rune_fee {
            return self.refund(tx, 108, &format!("output RUNE ({}) is not enough to pay transaction fee", emit.amount));
        }

        if emit.amount < target_trade {
            return self.refund(tx, 108, &format!("emit asset {} less than price limit {}", emit.amount, target_trade));
        }
        if emit.is_zero() {
            // zero-emission swaps are swallowed: no outbound, no refund.
            self.set_pool(pool);
            return Ok(vec![]);
        }

        self.set_pool(pool.clone());
        *self.liquidity.entry(target.to_layer1().to_string()).or_insert(0) += fee_rune;

        if target.is_synth() {
            self.events.push(Event::new(
                "mint_burn",
                vec![
                    ("supply".to_string(), "mint".to_string()),
                    ("denom".to_string(), target.to_string().to_lowercase()),
                    ("amount".to_string(), emit.amount.to_string()),
                    ("reason".to_string(), "swap".to_string()),
                ],
            ));
        }
        if coin.asset.is_synth() && !target.is_rune() {
            self.events.push(Event::new(
                "mint_burn",
                vec![
                    ("supply".to_string(), "burn".to_string()),
                    ("denom".to_string(), coin.asset.to_string().to_lowercase()),
                    ("amount".to_string(), coin.amount.to_string()),
                    ("reason".to_string(), "swap".to_string()),
                ],
            ));
        }

        self.push_swap_event(&in_tx, &coin, &emit, slip, fee_rune, &pool_status_str(&pool));

        let mut out_tx = Transaction::new(target.settlement_chain(), tx.to_address.clone(), destination, vec![emit], format!("OUT:{}", tx.id));
        out_tx.gas = None;

        let outbounds = self.handle_fee(tx, vec![out_tx])?;
        Ok(outbounds)
    }

    fn push_swap_event(&mut self, in_tx: &Transaction, coin: &Coin, emit: &Coin, slip: i64, fee_rune: i64, pool_status: &str) {
        self.events.push(Event::new(
            "swap",
            vec![
                ("pool".to_string(), if coin.is_rune() { emit.asset.to_layer1().to_string() } else { coin.asset.to_layer1().to_string() }),
                ("swap_target".to_string(), "0".to_string()),
                ("swap_slip".to_string(), slip.to_string()),
                ("liquidity_fee".to_string(), fee_rune.to_string()),
                ("liquidity_fee_in_rune".to_string(), fee_rune.to_string()),
                ("emit_asset".to_string(), format!("{} {}", emit.amount, emit.asset)),
                ("pool_status".to_string(), pool_status.to_string()),
                ("in_tx_id".to_string(), in_tx.id.clone()),
                ("id".to_string(), in_tx.id.clone()),
                ("chain".to_string(), in_tx.chain.clone()),
                ("from".to_string(), in_tx.from_address.clone()),
                ("to".to_string(), in_tx.to_address.clone()),
                ("coin".to_string(), format!("{} {}", coin.amount, coin.asset)),
                ("memo".to_string(), in_tx.memo.clone()),
            ],
        ));
    }
}

fn pool_status_str(pool: &Pool) -> String {
    pool.status.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coin;

    fn seeded_state() -> ThorchainState {
        let mut state = ThorchainState::default();
        let mut pool = Pool::new(Asset::parse("BNB.BNB"));
        pool.add(50_0000_0000, 50_0000_0000);
        pool.lp_units = 50_0000_0000;
        state.pools.push(pool);
        state
    }

    #[test]
    fn single_swap_matches_the_worked_example() {
        let state = seeded_state();
        let coin = Coin::new(Asset::rune(), 10_0000_0000);
        let (_, emit, _, slip) = state.swap(&coin, &Asset::parse("BNB.BNB"));
        assert_eq!(emit.amount, 694_444_444);
        assert_eq!(slip, 1667);
    }

    #[test]
    fn handle_swap_produces_exactly_one_outbound() {
        let mut state = seeded_state();
        let tx = Transaction::new(
            "THOR",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::rune(), 10_0000_0000)],
            "SWAP:BNB.BNB:bnb_dest",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_address, "bnb_dest");
    }

    #[test]
    fn swap_to_same_asset_is_refunded() {
        let mut state = seeded_state();
        let tx = Transaction::new("BNB", "alice", "VAULT", vec![Coin::new(Asset::parse("BNB.BNB"), 100)], "SWAP:BNB.BNB");
        let out = state.handle_swap(&tx).unwrap();
        assert!(out.is_empty());
        assert!(state.events.iter().any(|e| e.event_type == "refund"));
    }

    #[test]
    fn swap_below_price_limit_is_refunded_with_code_108() {
        let mut state = seeded_state();
        let tx = Transaction::new(
            "THOR",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::rune(), 10_0000_0000)],
            "SWAP:BNB.BNB:dest:999999999999",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert!(out.is_empty());
        let refund = state.events.iter().find(|e| e.event_type == "refund").unwrap();
        assert_eq!(refund.get("code"), Some("108"));
    }

    #[test]
    fn double_swap_emits_swap_outbound_swap_in_order() {
        let mut state = ThorchainState::default();
        let mut bnb_pool = Pool::new(Asset::parse("BNB.BNB"));
        bnb_pool.add(50_0000_0000, 50_0000_0000);
        bnb_pool.lp_units = 50_0000_0000;
        state.pools.push(bnb_pool);
        let mut lok_pool = Pool::new(Asset::parse("BNB.LOK-3C0"));
        lok_pool.add(30_0000_0000, 30_0000_0000);
        lok_pool.lp_units = 30_0000_0000;
        state.pools.push(lok_pool);

        let tx = Transaction::new(
            "BNB",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::parse("BNB.BNB"), 10_0000_0000)],
            "SWAP:BNB.LOK-3C0:dest",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].coins[0].amount, 457_856_148);

        let kinds: Vec<&str> = state.events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, vec!["swap", "outbound", "swap"]);

        let intermediate = &state.events[1];
        assert_eq!(intermediate.get("id"), Some(Transaction::EMPTY_ID));
        assert_eq!(intermediate.get("coin"), Some("694444444 THOR.RUNE"));
    }

    #[test]
    fn rune_inbound_too_small_to_cover_its_own_fee_is_refunded_with_code_108() {
        let mut state = seeded_state();
        let tx = Transaction::new(
            "THOR",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::rune(), 1_000_000)],
            "SWAP:BNB.BNB:bnb_dest",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert!(out.is_empty());
        let refund = state.events.iter().find(|e| e.event_type == "refund").unwrap();
        assert_eq!(refund.get("code"), Some("108"));
    }

    #[test]
    fn thor_prefixed_destination_for_a_layer1_target_is_refunded_with_code_105() {
        let mut state = seeded_state();
        let tx = Transaction::new(
            "THOR",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::rune(), 10_0000_0000)],
            "SWAP:BNB.BNB:thor1abcdef",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert!(out.is_empty());
        let refund = state.events.iter().find(|e| e.event_type == "refund").unwrap();
        assert_eq!(refund.get("code"), Some("105"));
    }

    #[test]
    fn thor_prefixed_destination_for_a_rune_target_is_not_refunded() {
        let mut state = ThorchainState::default();
        let mut pool = Pool::new(Asset::parse("BNB.BNB"));
        pool.add(50_0000_0000, 50_0000_0000);
        pool.lp_units = 50_0000_0000;
        state.pools.push(pool);
        let tx = Transaction::new(
            "BNB",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::parse("BNB.BNB"), 10_0000_0000)],
            "SWAP:THOR.RUNE:thor1abcdef",
        );
        let out = state.handle_swap(&tx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to_address, "thor1abcdef");
    }
}
