//! The deterministic settlement engine: pool math, the `ThorchainState`
//! handler set, and the constant-product swap formulas they all build on.

pub mod errors;
pub mod fees;
pub mod liquidity;
pub mod math;
pub mod pool;
pub mod rewards;
pub mod state;
pub mod swap;

pub use errors::StateError;
pub use pool::{LiquidityProvider, Pool, PoolStatus};
pub use state::{classify_memo, MemoKind, ThorchainState};
