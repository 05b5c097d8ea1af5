use crate::model::{Asset, Event, Transaction};

use super::errors::StateError;
use super::pool::Pool;
use super::state::ThorchainState;

impl ThorchainState {
    /// `ADD:<asset>[:address]` — credits whichever side of the pool arrived
    /// with this tx, parking a one-sided deposit as `pending` until its
    /// counterpart shows up from the other chain.
    pub fn handle_add_liquidity(&mut self, tx: &Transaction) -> Result<Vec<Transaction>, StateError> {
        let parts: Vec<&str> = tx.memo.split(':').collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return self.refund(tx, 105, "memo can't be empty");
        }

        let asset = Asset::parse(parts[1]);
        if asset.is_rune() {
            return self.refund(tx, 105, "invalid asset");
        }
        if asset.is_synth() {
            return self.refund(tx, 1, "fail to validate add liquidity");
        }
        if tx.coins.len() > 2 {
            return self.refund(tx, 105, "not expecting more than two coins");
        }
        for coin in &tx.coins {
            if !coin.is_rune() && coin.asset.to_layer1() != asset {
                return self.refund(tx, 105, "invalid coin for add liquidity");
            }
        }

        let mut rune_amt = 0i64;
        let mut asset_amt = 0i64;
        for coin in &tx.coins {
            if coin.is_rune() {
                rune_amt += coin.amount;
            } else {
                asset_amt += coin.amount;
            }
        }

        // The memo's third field (if any) always names the counterparty
        // address: an inbound on the RUNE chain supplies the rune address
        // from `from_address` directly and treats that field as the asset
        // address; an inbound on the asset's own chain does the reverse.
        let paired_address = parts.get(2).filter(|s| !s.is_empty()).map(|s| s.to_string());
        let (rune_address, asset_address) = if tx.chain == crate::model::RUNE_CHAIN {
            (Some(tx.from_address.clone()), paired_address)
        } else {
            (paired_address, Some(tx.from_address.clone()))
        };

        let mut pool = self.get_pool(&asset);
        let existed_before = !pool.is_zero() || pool.lp_units > 0;

        let fetch_address = super::pool::resolve_fetch_address(&rune_address, &asset_address);
        let existing_lp = pool.get_liquidity_provider(&fetch_address);
        if let (Some(declared), Some(known)) = (&asset_address, &existing_lp.asset_address) {
            if declared != known {
                return self.refund(tx, 100, "mismatch of asset address");
            }
        }

        let (units, rune_credited, asset_credited, pending_tx) =
            pool.add_liquidity(rune_address, asset_address, rune_amt, asset_amt, &tx.id);
        self.set_pool(pool.clone());

        if units == 0 {
            self.events.push(Event::new(
                "pending_liquidity",
                vec![
                    ("pool".to_string(), asset.to_string()),
                    ("rune_address".to_string(), tx.from_address.clone()),
                    ("rune_amount".to_string(), rune_amt.to_string()),
                    ("asset_amount".to_string(), asset_amt.to_string()),
                    ("pending_tx_id".to_string(), pending_tx.unwrap_or_default()),
                    ("type".to_string(), "add".to_string()),
                ],
            ));
            return Ok(vec![]);
        }

        self.events.push(Event::new(
            "add_liquidity",
            vec![
                ("pool".to_string(), asset.to_string()),
                ("liquidity_provider_units".to_string(), units.to_string()),
                ("rune_address".to_string(), tx.from_address.clone()),
                ("rune_amount".to_string(), rune_credited.to_string()),
                ("asset_amount".to_string(), asset_credited.to_string()),
                (format!("{}_txid", tx.chain), tx.id.clone()),
            ],
        ));

        if !existed_before {
            self.events.push(Event::new(
                "pool",
                vec![
                    ("pool".to_string(), asset.to_string()),
                    ("pool_status".to_string(), super::pool::PoolStatus::Available.to_string()),
                ],
            ));
        }

        Ok(vec![])
    }

    /// `WITHDRAW:<asset>:<bps>` — burns a provider's units (default all of
    /// them) and returns the proportional rune/asset share as two outbounds.
    pub fn handle_withdraw(&mut self, tx: &Transaction) -> Result<Vec<Transaction>, StateError> {
        let parts: Vec<&str> = tx.memo.split(':').collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return self.refund(tx, 105, "memo can't be empty");
        }

        let asset = Asset::parse(parts[1]);
        let bps: i64 = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(10_000);

        // Any RUNE accompanying a withdraw memo is not a deposit: it is
        // swallowed into the reserve, mirroring the reference node's
        // handling of a withdraw tx that also happens to carry a coin.
        for coin in &tx.coins {
            if coin.is_rune() {
                self.reserve += coin.amount;
            }
        }

        let address = Some(tx.from_address.clone());

        let mut pool = self.get_pool(&asset);
        let lp = pool.get_liquidity_provider(&address);
        if lp.is_zero() {
            return self.refund(tx, 105, "refund reason message: no liquidity provider");
        }

        let is_last_lp = lp.units == pool.lp_units;
        let (units, mut rune_out, mut asset_out) = pool.withdraw(&address, bps)?;

        if is_last_lp && bps == 10_000 {
            // Draining the last provider leaves unrecoverable dust in the
            // pool from prior integer-truncated deposits; sweep it out with
            // this final withdraw rather than stranding it forever.
            rune_out += pool.rune_balance;
            asset_out += pool.asset_balance;
            pool.rune_balance = 0;
            pool.asset_balance = 0;
        }

        self.set_pool(pool);

        let mut out_txs = Vec::new();
        if asset_out > 0 {
            out_txs.push(Transaction::new(
                asset.settlement_chain(),
                tx.to_address.clone(),
                tx.from_address.clone(),
                vec![crate::model::Coin::new(asset.clone(), asset_out)],
                format!("OUT:{}", tx.id),
            ));
        }
        if rune_out > 0 {
            out_txs.push(Transaction::new(
                crate::model::RUNE_CHAIN,
                tx.to_address.clone(),
                tx.from_address.clone(),
                vec![crate::model::Coin::new(Asset::rune(), rune_out)],
                format!("OUT:{}", tx.id),
            ));
        }

        self.events.push(Event::new(
            "withdraw",
            vec![
                ("pool".to_string(), asset.to_string()),
                ("liquidity_provider_units".to_string(), units.to_string()),
                ("basis_points".to_string(), bps.to_string()),
                ("asymmetry".to_string(), "0".to_string()),
                ("emit_rune".to_string(), rune_out.to_string()),
                ("emit_asset".to_string(), asset_out.to_string()),
            ],
        ));

        self.handle_fee(tx, out_txs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coin;

    #[test]
    fn add_liquidity_mints_units_and_emits_pool_available_on_first_touch() {
        let mut state = ThorchainState::default();
        let tx = Transaction::new(
            "THOR",
            "alice",
            "VAULT",
            vec![Coin::new(Asset::rune(), 100_0000_0000)],
            "ADD:BNB.BNB:bnb_addr",
        );
        state.handle_add_liquidity(&tx).unwrap();
        assert!(state.events.iter().any(|e| e.event_type == "pending_liquidity"));
    }

    #[test]
    fn add_liquidity_rejects_rune_as_the_pool_asset() {
        let mut state = ThorchainState::default();
        let tx = Transaction::new("THOR", "alice", "VAULT", vec![Coin::new(Asset::rune(), 100)], "ADD:THOR.RUNE");
        let out = state.handle_add_liquidity(&tx).unwrap();
        assert!(out.is_empty());
        assert!(state.events.iter().any(|e| e.event_type == "refund"));
    }

    #[test]
    fn withdraw_with_no_position_is_refunded() {
        let mut state = ThorchainState::default();
        let tx = Transaction::new("THOR", "alice", "VAULT", vec![], "WITHDRAW:BNB.BNB:10000");
        let out = state.handle_withdraw(&tx).unwrap();
        assert!(out.is_empty());
        assert!(state.events.iter().any(|e| e.event_type == "refund"));
    }

    #[test]
    fn full_withdraw_emits_two_outbounds() {
        let mut state = ThorchainState::default();
        let mut pool = Pool::new(Asset::parse("BNB.BNB"));
        pool.add_liquidity(Some("alice".into()), Some("alice".into()), 100_0000_0000, 10_0000_0000, "seed");
        state.pools.push(pool);

        let tx = Transaction::new("THOR", "alice", "VAULT", vec![], "WITHDRAW:BNB.BNB:10000");
        let out = state.handle_withdraw(&tx).unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn add_liquidity_rejects_a_changed_asset_address() {
        let mut state = ThorchainState::default();
        let first = Transaction::new(
            "THOR",
            "rune_addr",
            "VAULT",
            vec![Coin::new(Asset::rune(), 100_0000_0000)],
            "ADD:BNB.BNB:asset_addr_1",
        );
        state.handle_add_liquidity(&first).unwrap();

        let second = Transaction::new(
            "BNB",
            "asset_addr_2",
            "VAULT",
            vec![Coin::new(Asset::parse("BNB.BNB"), 1_0000_0000)],
            "ADD:BNB.BNB:rune_addr",
        );
        let out = state.handle_add_liquidity(&second).unwrap();
        assert!(out.is_empty());
        let refund = state.events.iter().rev().find(|e| e.event_type == "refund").unwrap();
        assert_eq!(refund.get("code"), Some("100"));
    }
}
