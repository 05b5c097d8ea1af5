//! The differential replay harness ("smoker"): feeds a scripted transaction
//! list to the reference simulator and a live mocknet, aligning their event
//! streams and failing loudly on divergence.

pub mod fixtures;

#[cfg(feature = "full")]
pub mod harness;

#[cfg(feature = "full")]
pub use harness::Harness;
pub use fixtures::{ScriptedBalance, ScriptedCoin, ScriptedEvent, ScriptedTx, SmokeFixtures};
