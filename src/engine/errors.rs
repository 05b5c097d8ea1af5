use thiserror::Error;

/// Programmer-error-class failures: these are never user-recoverable and are
/// never represented as a `refund` event. A handler that would hit one of
/// these aborts the whole simulator, mirroring the reference node raising a
/// bare `Exception` on the same conditions.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("insufficient funds: pool {asset} would go negative (rune {rune}, asset {asset_amt})")]
    PoolUnderflow { asset: String, rune: i64, asset_amt: i64 },

    #[error("overdrawn liquidity provider units for {address}: {units} remaining")]
    LiquidityUnderflow { address: String, units: i64 },

    #[error("withdraw basis points must be between 0 and 10,000, got {0}")]
    InvalidBasisPoints(i64),
}
