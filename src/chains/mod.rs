//! External-chain adapters. Every chain the harness drives (Binance Chain,
//! Bitcoin, Bitcoin Cash, Litecoin, Dogecoin, Ethereum, Cosmos, plus THORChain
//! itself) implements the same narrow [`ChainClient`] trait. The default
//! implementations are in-process mocks tracking balances in a `HashMap` —
//! no real network sockets are opened, exactly like the original per-chain
//! Python mocks this replaces.

pub mod aliases;

use std::collections::HashMap;

use async_trait::async_trait;

use aliases::AliasTable;
use crate::model::{Asset, Coin, Transaction};

/// Rolling fee-rate/size estimates a UTXO-family chain's background block
/// scanner maintains, read by `engine::state` to price outbound gas.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockStats {
    pub tx_rate: i64,
    pub tx_size: i64,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    fn chain(&self) -> &str;

    async fn block_height(&self) -> u64;

    /// Total balance of `asset` at `address` (all assets if `asset` is
    /// `None` and the chain supports that, e.g. Cosmos/Binance).
    async fn balance(&self, address: &str, asset: Option<&Asset>) -> Vec<Coin>;

    /// Broadcasts `tx`, assigning it a chain-specific tx hash and observed
    /// `gas`. Mutates in place so the caller keeps a single owned value
    /// with the fields a real chain would have filled in by the time it's
    /// visible to `sim_catch_up`.
    async fn transfer(&mut self, tx: &mut Transaction);

    fn set_vault_address(&mut self, address: String);

    /// Directly credits `address` with `coin`, bypassing `transfer`. Used
    /// by `--generate-balances` to pre-fund scripted accounts instead of
    /// assuming a pre-funded mocknet. The default no-op fits a future
    /// network-backed adapter that can't credit a real chain out of thin
    /// air.
    fn seed_balance(&mut self, _address: &str, _coin: Coin) {}

    fn block_stats(&self) -> BlockStats {
        BlockStats::default()
    }
}

/// A chain adapter shared between the harness's main loop and its
/// background scanner task, per the concurrency model's "Tokio task writing
/// to `Arc<Mutex<…>>`" shape: both sides lock briefly, so contention is
/// negligible and the scanner never blocks a broadcast for long.
pub type SharedChain = std::sync::Arc<tokio::sync::Mutex<Box<dyn ChainClient>>>;

/// Polls a chain adapter's [`BlockStats`] on a fixed interval and republishes
/// the sample into a shared table, standing in for the reference harness's
/// per-chain background block scanner. Scanners never mutate simulator
/// state directly — they only ever write the scalar counters
/// `engine::state::ThorchainState` reads back on its own schedule, matching
/// the spec's "eventual visibility, idempotent samples" contract.
pub fn spawn_block_scanner(
    chain: SharedChain,
    samples: std::sync::Arc<std::sync::Mutex<HashMap<String, BlockStats>>>,
    interval: std::time::Duration,
    shutdown: std::sync::Arc<std::sync::atomic::AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if shutdown.load(std::sync::atomic::Ordering::Relaxed) {
                return;
            }
            let (name, stats) = {
                let guard = chain.lock().await;
                (guard.chain().to_string(), guard.block_stats())
            };
            if let Ok(mut table) = samples.lock() {
                table.insert(name, stats);
            }
            tokio::time::sleep(interval).await;
        }
    })
}

/// A narrow, in-memory mock chain: balances live in a `HashMap`, transfers
/// debit the sender and credit the recipient, and the tx id is a
/// deterministic counter-derived hash rather than a real signature.
pub struct MockChain {
    chain: String,
    gas_asset: Asset,
    flat_gas: i64,
    balances: HashMap<String, HashMap<Asset, i64>>,
    vault_address: Option<String>,
    next_txid: u64,
    block_height: u64,
    /// Resolved at broadcast time per the spec's alias contract, never
    /// inside the AMM core — `transfer` is the only place `to`/`from`
    /// get rewritten before balances move.
    aliases: AliasTable,
}

impl MockChain {
    pub fn new(chain: impl Into<String>, gas_asset: Asset, flat_gas: i64) -> Self {
        Self {
            chain: chain.into(),
            gas_asset,
            flat_gas,
            balances: HashMap::new(),
            vault_address: None,
            next_txid: 1,
            block_height: 1,
            aliases: AliasTable::new(),
        }
    }

    /// Registers a short name (`"MASTER"`, `"PROVIDER-1"`, …) this chain
    /// should resolve to `address` the next time it appears as a `transfer`
    /// endpoint.
    pub fn register_alias(&mut self, name: impl Into<String>, address: impl Into<String>) {
        self.aliases.register(name, address);
    }

    pub fn binance() -> Self {
        Self::new("BNB", Asset::new("BNB", "BNB", false), 37_500)
    }

    pub fn bitcoin() -> Self {
        Self::new("BTC", Asset::new("BTC", "BTC", false), 0)
    }

    pub fn bitcoin_cash() -> Self {
        Self::new("BCH", Asset::new("BCH", "BCH", false), 0)
    }

    pub fn litecoin() -> Self {
        Self::new("LTC", Asset::new("LTC", "LTC", false), 0)
    }

    pub fn dogecoin() -> Self {
        Self::new("DOGE", Asset::new("DOGE", "DOGE", false), 0)
    }

    pub fn ethereum() -> Self {
        Self::new("ETH", Asset::new("ETH", "ETH", false), 0)
    }

    pub fn gaia() -> Self {
        Self::new("GAIA", Asset::new("GAIA", "ATOM", false), 0)
    }

    pub fn thorchain() -> Self {
        Self::new("THOR", Asset::rune(), 2_000_000)
    }

    pub fn seed_balance(&mut self, address: impl Into<String>, coin: Coin) {
        *self.balances.entry(address.into()).or_default().entry(coin.asset).or_insert(0) += coin.amount;
    }

    fn next_hash(&mut self) -> String {
        let id = self.next_txid;
        self.next_txid += 1;
        format!("{:0>64X}", id)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn chain(&self) -> &str {
        &self.chain
    }

    async fn block_height(&self) -> u64 {
        self.block_height
    }

    async fn balance(&self, address: &str, asset: Option<&Asset>) -> Vec<Coin> {
        let Some(account) = self.balances.get(address) else { return vec![] };
        match asset {
            Some(a) => account.get(a).map(|amt| vec![Coin::new(a.clone(), *amt)]).unwrap_or_default(),
            None => account.iter().map(|(a, amt)| Coin::new(a.clone(), *amt)).collect(),
        }
    }

    async fn transfer(&mut self, tx: &mut Transaction) {
        tx.from_address = self.aliases.resolve(&tx.from_address).to_string();
        tx.to_address = self.aliases.resolve(&tx.to_address).to_string();

        for coin in &tx.coins {
            let sender = self.balances.entry(tx.from_address.clone()).or_default();
            *sender.entry(coin.asset.clone()).or_insert(0) -= coin.amount;
            let recipient = self.balances.entry(tx.to_address.clone()).or_default();
            *recipient.entry(coin.asset.clone()).or_insert(0) += coin.amount;
        }

        if self.flat_gas > 0 {
            tx.gas = Some(vec![Coin::new(self.gas_asset.clone(), self.flat_gas)]);
        }
        tx.id = self.next_hash();
        self.block_height += 1;
    }

    fn set_vault_address(&mut self, address: String) {
        self.aliases.register("VAULT", address.clone());
        self.vault_address = Some(address);
    }

    fn seed_balance(&mut self, address: &str, coin: Coin) {
        MockChain::seed_balance(self, address, coin);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn transfer_debits_sender_and_credits_recipient() {
        let mut chain = MockChain::binance();
        chain.seed_balance("alice", Coin::new(Asset::parse("BNB.BNB"), 1000));

        let mut tx = Transaction::new("BNB", "alice", "vault", vec![Coin::new(Asset::parse("BNB.BNB"), 100)], "SWAP:RUNE");
        chain.transfer(&mut tx).await;

        assert_eq!(chain.balance("alice", Some(&Asset::parse("BNB.BNB"))).await[0].amount, 900);
        assert_eq!(chain.balance("vault", Some(&Asset::parse("BNB.BNB"))).await[0].amount, 100);
        assert_ne!(tx.id, Transaction::TODO_ID);
        assert!(tx.gas.is_some());
    }
}
