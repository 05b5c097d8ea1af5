pub mod asset;
pub mod coin;
pub mod event;
pub mod transaction;

pub use asset::Asset;
pub use coin::Coin;
pub use event::Event;
pub use transaction::Transaction;

/// 1 unit of any on-chain asset equals 1e8 base units.
pub const ONE: i64 = 100_000_000;

/// Chain identifier for the network's own settlement asset.
pub const RUNE_CHAIN: &str = "THOR";
