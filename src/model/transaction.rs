use std::cmp::Ordering;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Asset, Coin};

/// A transaction on a chain (inbound from a user, or outbound from the vault).
///
/// `id` starts out as the sentinel `"TODO"`; a chain adapter fills it in with
/// the real tx hash on broadcast, or the simulator derives a deterministic
/// hash via [`Transaction::custom_hash`] for outbounds it originates itself.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: String,
    pub chain: String,
    pub from_address: String,
    pub to_address: String,
    pub coins: Vec<Coin>,
    pub memo: String,
    pub gas: Option<Vec<Coin>>,
    pub max_gas: Option<Vec<Coin>>,
    pub fee: Option<Coin>,
}

impl Transaction {
    pub const TODO_ID: &'static str = "TODO";
    pub const EMPTY_ID: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";

    pub fn new(
        chain: impl Into<String>,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
        coins: Vec<Coin>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            id: Self::TODO_ID.to_string(),
            chain: chain.into(),
            from_address: from_address.into(),
            to_address: to_address.into(),
            coins,
            memo: memo.into(),
            gas: None,
            max_gas: None,
            fee: None,
        }
    }

    pub fn empty() -> Self {
        let mut tx = Self::new("", "", "", vec![], "");
        tx.id = Self::EMPTY_ID.to_string();
        tx
    }

    pub fn with_id(mut self, id: impl AsRef<str>) -> Self {
        self.id = id.as_ref().to_uppercase();
        self
    }

    pub fn with_gas(mut self, gas: Vec<Coin>) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn with_max_gas(mut self, max_gas: Vec<Coin>) -> Self {
        self.max_gas = Some(max_gas);
        self
    }

    pub fn is_refund(&self) -> bool {
        self.memo.contains("REFUND")
    }

    pub fn is_cross_chain_provision(&self) -> bool {
        self.memo.starts_with("ADD:") && self.memo.split(':').count() == 3
    }

    pub fn asset_from_memo(&self) -> Option<Asset> {
        let mut parts = self.memo.split(':');
        parts.next();
        match parts.next() {
            Some(s) if !s.is_empty() => Some(Asset::parse(s)),
            _ => None,
        }
    }

    pub fn coins_str(&self) -> String {
        self.coins
            .iter()
            .map(|c| format!("{} {}", c.amount, c.asset))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn get_attributes(&self) -> Vec<(String, String)> {
        vec![
            ("id".into(), self.id.clone()),
            ("chain".into(), self.chain.clone()),
            ("from".into(), self.from_address.clone()),
            ("to".into(), self.to_address.clone()),
            ("coin".into(), self.coins_str()),
            ("memo".into(), self.memo.clone()),
        ]
    }

    /// Deterministic hash used to sort simulator-originated outbounds into
    /// the exact broadcast order the live node will choose.
    pub fn custom_hash(&self, vault_pubkey: &str) -> String {
        let coins = self.coins_str();
        let in_hash = self.memo.split(':').nth(1).unwrap_or("");
        let tmp = format!("{}|{}|{}|{}||{}", self.chain, self.to_address, vault_pubkey, coins, in_hash);
        let digest = Sha256::digest(tmp.as_bytes());
        hex::encode(digest).to_uppercase()
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        let id_matches = self.id == Self::TODO_ID
            || self.id == Self::EMPTY_ID
            || self.id.eq_ignore_ascii_case(&other.id);

        let mut coins = self.coins.clone();
        let mut other_coins = other.coins.clone();
        coins.sort();
        other_coins.sort();

        let mut gas = self.gas.clone().unwrap_or_default();
        let mut other_gas = other.gas.clone().unwrap_or_default();
        gas.sort();
        other_gas.sort();

        id_matches
            && self.chain == other.chain
            && self.memo == other.memo
            && coins == other_coins
            && gas == other_gas
    }
}

impl Eq for Transaction {}

impl PartialOrd for Transaction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Transaction {
    fn cmp(&self, other: &Self) -> Ordering {
        let mut coins = self.coins.clone();
        let mut other_coins = other.coins.clone();
        coins.sort();
        other_coins.sort();
        coins.cmp(&other_coins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_from_memo_parses_the_second_field() {
        let tx = Transaction::new("BNB", "a", "b", vec![], "SWAP:BNB.BNB:dest");
        assert_eq!(tx.asset_from_memo(), Some(Asset::parse("BNB.BNB")));
    }

    #[test]
    fn asset_from_memo_is_none_when_field_is_missing_or_empty() {
        assert_eq!(Transaction::new("BNB", "a", "b", vec![], "RESERVE").asset_from_memo(), None);
        assert_eq!(Transaction::new("BNB", "a", "b", vec![], "ADD:").asset_from_memo(), None);
    }

    #[test]
    fn cross_chain_provision_requires_a_third_memo_field() {
        assert!(Transaction::new("BNB", "a", "b", vec![], "ADD:BNB.BNB:addr").is_cross_chain_provision());
        assert!(!Transaction::new("BNB", "a", "b", vec![], "ADD:BNB.BNB").is_cross_chain_provision());
    }

    #[test]
    fn custom_hash_is_deterministic() {
        let tx = Transaction::new(
            "BNB",
            "a",
            "vault_addr",
            vec![Coin::new(Asset::rune(), 100)],
            "OUT:ABC123",
        );
        let h1 = tx.custom_hash("pubkey1");
        let h2 = tx.custom_hash("pubkey1");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, tx.custom_hash("pubkey2"));
    }

    #[test]
    fn equality_ignores_addresses_but_not_coins() {
        let a = Transaction::new("BNB", "alice", "vault", vec![Coin::new(Asset::rune(), 10)], "SWAP:BNB.BNB");
        let b = Transaction::new("BNB", "bob", "other_vault", vec![Coin::new(Asset::rune(), 10)], "SWAP:BNB.BNB");
        assert_eq!(a, b);
    }

    #[test]
    fn todo_id_is_a_wildcard() {
        let a = Transaction::new("BNB", "a", "b", vec![], "RESERVE");
        let b = Transaction::new("BNB", "a", "b", vec![], "RESERVE").with_id("deadbeef");
        assert_eq!(a, b);
    }
}
