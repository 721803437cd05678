//! # Auction Error Types
//!
//! Every rejection the engine can produce. Configuration errors are raised
//! once at creation; sequencing and invariant-guard errors are raised per
//! call and leave engine state untouched.

use doppler_math::MathError;
use thiserror::Error;

use crate::phase::AuctionPhase;
use crate::pool::PoolError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid time range: start {starting_time}, end {ending_time}")]
    InvalidTimeRange { starting_time: u64, ending_time: u64 },

    #[error("Invalid epoch length {0}")]
    InvalidEpochLength(u64),

    #[error("Minimum proceeds {minimum} exceed maximum proceeds {maximum}")]
    InvalidProceedsBounds { minimum: u128, maximum: u128 },

    #[error("Invalid tick range: starting {starting_tick}, ending {ending_tick}")]
    InvalidTickRange { starting_tick: i32, ending_tick: i32 },

    #[error("Invalid gamma {0}")]
    InvalidGamma(i32),

    #[error("Invalid number of price discovery slugs {0}")]
    InvalidNumPdSlugs(u8),

    #[error("Invalid swap fee {0}")]
    InvalidLpFee(u32),

    #[error("Nothing to sell")]
    ZeroTokensToSell,

    #[error("Tick range too narrow for {num_epochs} epochs")]
    TickDeltaTooSmall { num_epochs: u64 },

    // ========================================================================
    // Sequencing Errors
    // ========================================================================
    #[error("Auction already bound to a pool")]
    AlreadyInitialized,

    #[error("Auction not bound to a pool")]
    NotInitialized,

    #[error("Invalid tick spacing {0}")]
    InvalidTickSpacing(i32),

    #[error("Gamma {gamma} is not a multiple of tick spacing {tick_spacing}")]
    GammaNotMultipleOfSpacing { gamma: i32, tick_spacing: i32 },

    #[error("Cannot swap before the auction starts")]
    CannotSwapBeforeStartTime,

    #[error("Maximum proceeds reached")]
    MaximumProceedsReached,

    #[error("Auction already migrated")]
    AuctionMigrated,

    #[error("Auction ended with sufficient proceeds")]
    SwapAfterMaturitySufficientProceeds,

    #[error("Only the auction can add liquidity")]
    CannotAddLiquidity,

    #[error("Caller is not the migrator")]
    Unauthorized,

    #[error("Auction is not eligible for migration")]
    MigrationNotEligible,

    #[error("Invalid phase transition from {from:?} to {to:?}")]
    InvalidPhaseTransition { from: AuctionPhase, to: AuctionPhase },

    // ========================================================================
    // Invariant Guards
    // ========================================================================
    #[error("Swap moved the price below the lower slug")]
    SwapBelowRange,

    #[error("Only asset sales are allowed after maturity with insufficient proceeds")]
    InvalidSwapAfterMaturityInsufficientProceeds,

    #[error("Tick accumulator {0} outside the tick domain")]
    AccumulatorOutOfRange(i128),

    #[error("Engine balance too small for {0}")]
    InsufficientBalance(&'static str),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    #[error(transparent)]
    Math(#[from] MathError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result type for auction operations
pub type AuctionResult<T> = Result<T, AuctionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_errors_convert() {
        let err: AuctionError = MathError::DivisionByZero.into();
        assert_eq!(err, AuctionError::Math(MathError::DivisionByZero));
        assert_eq!(err.to_string(), "Division by zero");
    }

    #[test]
    fn test_messages_carry_context() {
        let err = AuctionError::GammaNotMultipleOfSpacing {
            gamma: 1000,
            tick_spacing: 30,
        };
        assert_eq!(err.to_string(), "Gamma 1000 is not a multiple of tick spacing 30");
    }
}
