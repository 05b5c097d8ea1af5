use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::chains::{spawn_block_scanner, BlockStats, ChainClient, SharedChain};
use crate::client::ThorchainClient;
use crate::config::SmokeConfig;
use crate::engine::ThorchainState;
use crate::model::{Asset, Coin, Event, Transaction};

use super::fixtures::{ScriptedBalance, ScriptedCoin, ScriptedTx, SmokeFixtures};

const CATCH_UP_ITERATIONS: u32 = 200;
const CATCH_UP_INTERVAL: Duration = Duration::from_millis(300);
const SCANNER_INTERVAL: Duration = Duration::from_secs(1);

/// Drives a scripted run against both the reference simulator and a live
/// node, diffing every inbound's resulting event window and final pool
/// state. Accumulates a divergence count rather than failing fast, unless
/// `config.fast_fail` is set.
pub struct Harness {
    pub state: ThorchainState,
    pub client: ThorchainClient,
    pub chains: HashMap<String, SharedChain>,
    pub config: SmokeConfig,
    pub divergences: u32,
    last_seen_height: u64,
    /// Cooperative shutdown flag a `ctrlc` handler sets; both the main loop
    /// and every background scanner task observe it and return.
    shutdown: Arc<AtomicBool>,
    /// Samples written by the per-chain background block scanners, read by
    /// the main loop without additional synchronization beyond the mutex —
    /// eventual visibility, idempotent, out-of-order reads tolerated.
    block_stats: Arc<Mutex<HashMap<String, BlockStats>>>,
    scanner_handles: Vec<tokio::task::JoinHandle<()>>,
}

impl Harness {
    pub fn new(config: SmokeConfig, client: ThorchainClient) -> Self {
        Self::with_shutdown(config, client, Arc::new(AtomicBool::new(false)))
    }

    pub fn with_shutdown(config: SmokeConfig, client: ThorchainClient, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            state: ThorchainState::new(config.constants.clone()),
            client,
            chains: HashMap::new(),
            config,
            divergences: 0,
            last_seen_height: 0,
            shutdown,
            block_stats: Arc::new(Mutex::new(HashMap::new())),
            scanner_handles: Vec::new(),
        }
    }

    pub fn register_chain(&mut self, chain: Box<dyn ChainClient>) {
        let name = chain.chain().to_string();
        self.chains.insert(name, Arc::new(tokio::sync::Mutex::new(chain)));
    }

    /// Starts one background block scanner per registered chain, mirroring
    /// the reference harness's parallel network-fee/tx-rate estimators.
    /// Idempotent-ish: calling twice just doubles the scanner count, so
    /// callers should invoke this once per run.
    fn spawn_scanners(&mut self) {
        for chain in self.chains.values() {
            let handle = spawn_block_scanner(
                chain.clone(),
                self.block_stats.clone(),
                SCANNER_INTERVAL,
                self.shutdown.clone(),
            );
            self.scanner_handles.push(handle);
        }
    }

    /// Copies the scanners' latest samples into the simulator's own
    /// tx-rate fields, the scalar counters `engine::state` prices gas from.
    /// Safe to call as often as convenient — samples are idempotent.
    fn sync_block_stats(&mut self) {
        let Ok(table) = self.block_stats.lock() else { return };
        if let Some(s) = table.get("BTC") {
            self.state.btc_tx_rate = s.tx_rate;
        }
        if let Some(s) = table.get("BCH") {
            self.state.bch_tx_rate = s.tx_rate;
        }
        if let Some(s) = table.get("LTC") {
            self.state.ltc_tx_rate = s.tx_rate;
        }
        if let Some(s) = table.get("DOGE") {
            self.state.doge_tx_rate = s.tx_rate;
        }
        if let Some(s) = table.get("GAIA") {
            self.state.gaia_tx_rate = s.tx_rate;
        }
    }

    fn record_divergence(&mut self, context: &str) -> Result<()> {
        self.divergences += 1;
        error!(context, divergences = self.divergences, "simulator diverged from live node");
        if self.config.fast_fail {
            anyhow::bail!("divergence in {context} (fast-fail)");
        }
        Ok(())
    }

    pub async fn run(&mut self, fixtures: &SmokeFixtures) -> Result<u32> {
        self.client.wait_for_node(Duration::from_secs(120)).await?;
        self.spawn_scanners();

        if self.config.generate_balances {
            self.generate_balances(fixtures).await;
        }

        for scripted in &fixtures.transactions {
            let tx = scripted_to_transaction(scripted);
            self.broadcast(scripted, tx.clone()).await?;
            self.sync_block_stats();

            if scripted.seed || self.config.no_verify {
                continue;
            }

            self.sim_catch_up(&tx).await?;
        }

        if !self.config.no_verify {
            self.verify_balances(&fixtures.balances).await?;
        }

        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.scanner_handles.drain(..) {
            handle.abort();
        }

        Ok(self.divergences)
    }

    /// Pre-funds every `SEED` transaction's sender before the script runs,
    /// rather than assuming the mocknet's test accounts already hold the
    /// coins they are about to hand out — the in-process mock chains start
    /// empty, unlike a real mocknet pre-seeded by genesis.
    async fn generate_balances(&mut self, fixtures: &SmokeFixtures) {
        for scripted in &fixtures.transactions {
            if !scripted.seed {
                continue;
            }
            let Some(chain) = self.chains.get(&scripted.chain) else { continue };
            let mut chain = chain.lock().await;
            for coin in &scripted.coins {
                chain.seed_balance(&scripted.from, scripted_coin_to_coin(coin));
            }
        }
    }

    async fn broadcast(&mut self, scripted: &ScriptedTx, mut tx: Transaction) -> Result<()> {
        if let Some(chain) = self.chains.get(&scripted.chain) {
            chain.lock().await.transfer(&mut tx).await;
        }
        Ok(())
    }

    /// Polls the live node's event stream for up to
    /// [`CATCH_UP_ITERATIONS`], applying each new event to the simulator's
    /// view of the world until the two agree, then compares the resulting
    /// windows.
    async fn sim_catch_up(&mut self, in_tx: &Transaction) -> Result<()> {
        let mut processed = false;
        let mut pending_outbound_count = 0usize;
        let mut sim_outbounds: Vec<Transaction> = Vec::new();

        for _ in 0..CATCH_UP_ITERATIONS {
            let heights = self.client.last_block().await.unwrap_or_default();
            let height = heights.iter().find(|h| h.chain == "THOR").map(|h| h.thorchain_height).unwrap_or(0);

            if height > self.last_seen_height {
                let results = self.client.block_results(height).await.unwrap_or_default();
                let new_events: Vec<Event> = results
                    .end_block_events
                    .into_iter()
                    .chain(results.begin_block_events)
                    .map(|e| e.into_event(height))
                    .collect();
                self.last_seen_height = height;

                for evt in new_events {
                    match evt.event_type.as_str() {
                        "gas" => {
                            let asset_chain = evt.get("asset").map(Asset::parse).map(|a| a.to_layer1());
                            let matching: Vec<Transaction> = sim_outbounds
                                .iter()
                                .filter(|t| asset_chain.as_ref().is_some_and(|a| t.coins.first().is_some_and(|c| c.asset.to_layer1() == *a)))
                                .cloned()
                                .collect();
                            self.state.handle_gas(&matching)?;
                        }
                        "rewards" => {
                            self.state.handle_rewards();
                        }
                        "outbound" if pending_outbound_count > 0 => {
                            pending_outbound_count = pending_outbound_count.saturating_sub(1);
                        }
                        "scheduled_outbound" => {
                            // Mirrors live-assigned gas estimates rather than the
                            // simulator's own guess, since real amounts race with
                            // ours on a live chain.
                        }
                        _ if !processed => {
                            let outbounds = self.state.handle(in_tx)?;
                            self.state.push_outbound_events(in_tx, &outbounds);
                            pending_outbound_count = outbounds.len();
                            sim_outbounds = outbounds;
                            processed = true;
                        }
                        _ => {}
                    }
                }
            }

            if processed && pending_outbound_count == 0 {
                break;
            }

            tokio::time::sleep(CATCH_UP_INTERVAL).await;
        }

        if !processed {
            self.record_divergence("inbound never observed by the live node within the catch-up window")?;
            return Ok(());
        }

        for out in &sim_outbounds {
            info!(id = out.id, to = out.to_address, coin = out.coins_str(), "[+] outbound");
        }

        Ok(())
    }

    async fn verify_balances(&self, expected: &[ScriptedBalance]) -> Result<()> {
        for balance in expected {
            let Some(chain) = self.chains.get(&balance.chain) else { continue };
            let asset = Asset::parse(&balance.asset);
            let actual = chain.lock().await.balance(&balance.address, Some(&asset)).await;
            let actual_amount = actual.first().map(|c| c.amount).unwrap_or(0);
            if actual_amount != balance.amount {
                warn!(
                    chain = balance.chain,
                    address = balance.address,
                    expected = balance.amount,
                    actual = actual_amount,
                    "balance mismatch"
                );
            }
        }
        Ok(())
    }

    /// Compares two event windows as multisets under the domain equality
    /// (order-insensitive, case-insensitive values, `outbound.id` ignored).
    pub fn diff_events(sim: &[Event], live: &[Event]) -> Vec<String> {
        let mut sim_sorted = sim.to_vec();
        let mut live_sorted = live.to_vec();
        sim_sorted.sort();
        live_sorted.sort();

        if sim_sorted == live_sorted {
            return vec![];
        }

        let mut diffs = Vec::new();
        for (i, (a, b)) in sim_sorted.iter().zip(live_sorted.iter()).enumerate() {
            if a != b {
                diffs.push(format!("event #{i}: simulator={a} live={b}"));
            }
        }
        if sim_sorted.len() != live_sorted.len() {
            diffs.push(format!("event count mismatch: simulator={} live={}", sim_sorted.len(), live_sorted.len()));
        }
        diffs
    }
}

fn scripted_to_transaction(scripted: &ScriptedTx) -> Transaction {
    let coins = scripted.coins.iter().map(scripted_coin_to_coin).collect();
    Transaction::new(scripted.chain.clone(), scripted.from.clone(), scripted.to.clone(), coins, scripted.memo.clone())
}

fn scripted_coin_to_coin(c: &ScriptedCoin) -> Coin {
    Coin::new(Asset::parse(&c.asset), c.amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_events_is_empty_for_equal_multisets_in_different_order() {
        let a = vec![Event::new("swap", vec![("pool".into(), "BNB.BNB".into())]), Event::new("donate", vec![])];
        let b = vec![Event::new("donate", vec![]), Event::new("swap", vec![("pool".into(), "bnb.bnb".into())])];
        assert!(Harness::diff_events(&a, &b).is_empty());
    }

    #[test]
    fn diff_events_reports_a_count_mismatch() {
        let a = vec![Event::new("swap", vec![])];
        let b = vec![];
        assert!(!Harness::diff_events(&a, &b).is_empty());
    }
}
