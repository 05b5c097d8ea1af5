//! Typed persisted-input fixtures: the three JSON files that drive a smoke
//! run (`smoke_test_transactions.json`, `smoke_test_balances.json`,
//! `smoke_test_events.json`), deserialized with `serde_json` into structs
//! carrying `schemars::JsonSchema` for documentation parity with the rest
//! of the codebase.

use schemars::JsonSchema;
use serde::Deserialize;

/// One scripted inbound transaction, as written into
/// `smoke_test_transactions.json`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScriptedTx {
    pub chain: String,
    pub from: String,
    pub to: String,
    pub coins: Vec<ScriptedCoin>,
    pub memo: String,
    /// A `SEED` transaction is broadcast to fund chain balances before the
    /// run starts and is never diffed against the live node.
    #[serde(default)]
    pub seed: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScriptedCoin {
    pub asset: String,
    pub amount: i64,
}

/// A single account's expected balance on a given chain, checked after the
/// run against the chain adapter's own bookkeeping.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScriptedBalance {
    pub chain: String,
    pub address: String,
    pub asset: String,
    pub amount: i64,
}

/// An expected event window, checked against the simulator's log under the
/// event-equality rule (attribute order/case-insensitive, `outbound.id`
/// ignored).
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ScriptedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub attributes: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct SmokeFixtures {
    #[serde(default)]
    pub transactions: Vec<ScriptedTx>,
    #[serde(default)]
    pub balances: Vec<ScriptedBalance>,
    #[serde(default)]
    pub events: Vec<ScriptedEvent>,
}

impl SmokeFixtures {
    pub fn load(transactions_path: &str, balances_path: &str, events_path: &str) -> anyhow::Result<Self> {
        use anyhow::Context;
        use std::fs;

        let transactions: Vec<ScriptedTx> = serde_json::from_str(
            &fs::read_to_string(transactions_path).with_context(|| format!("reading {transactions_path}"))?,
        )
        .with_context(|| format!("parsing {transactions_path}"))?;
        let balances: Vec<ScriptedBalance> = serde_json::from_str(
            &fs::read_to_string(balances_path).with_context(|| format!("reading {balances_path}"))?,
        )
        .with_context(|| format!("parsing {balances_path}"))?;
        let events: Vec<ScriptedEvent> =
            serde_json::from_str(&fs::read_to_string(events_path).with_context(|| format!("reading {events_path}"))?)
                .with_context(|| format!("parsing {events_path}"))?;

        Ok(Self { transactions, balances, events })
    }
}
