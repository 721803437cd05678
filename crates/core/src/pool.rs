//! # Pool Contract
//!
//! The surface the engine consumes from the concentrated-liquidity pool it
//! is attached to. Amounts in a [`BalanceDelta`] are signed from the
//! caller's point of view: positive means the caller receives tokens,
//! negative means the caller owes them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque account identifier (trader, engine, migrator, recipient)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque token identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Currency(pub String);

impl Currency {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the pool an auction is bound to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolKey {
    /// Low-address token
    pub currency0: Currency,
    /// High-address token
    pub currency1: Currency,
    pub tick_spacing: i32,
}

// ============================================================================
// Pool Data
// ============================================================================

/// Current price and fee settings of the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slot0 {
    pub sqrt_price_x64: u128,
    pub tick: i32,
    /// Protocol fee in pips
    pub protocol_fee: u32,
    /// Pool LP fee in pips
    pub lp_fee: u32,
}

/// Signed token amounts from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceDelta {
    pub amount0: i128,
    pub amount1: i128,
}

impl BalanceDelta {
    pub const ZERO: BalanceDelta = BalanceDelta {
        amount0: 0,
        amount1: 0,
    };

    pub fn new(amount0: i128, amount1: i128) -> Self {
        Self { amount0, amount1 }
    }
}

/// Liquidity change on one range; ticks are numerically ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyLiquidityParams {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity_delta: i128,
    /// Distinguishes positions sharing a range; the engine uses the slug id
    pub salt: u8,
}

/// Trade request as seen by the hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    /// Selling token0 for token1
    pub zero_for_one: bool,
    /// Negative for exact input, positive for exact output
    pub amount_specified: i128,
    pub sqrt_price_limit_x64: Option<u128>,
}

impl SwapParams {
    pub fn exact_input(zero_for_one: bool, amount_in: u128) -> Self {
        Self {
            zero_for_one,
            amount_specified: -(amount_in.min(i128::MAX as u128) as i128),
            sqrt_price_limit_x64: None,
        }
    }

    pub fn exact_output(zero_for_one: bool, amount_out: u128) -> Self {
        Self {
            zero_for_one,
            amount_specified: amount_out.min(i128::MAX as u128) as i128,
            sqrt_price_limit_x64: None,
        }
    }

    pub fn is_exact_input(&self) -> bool {
        self.amount_specified < 0
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Invalid position range [{tick_lower}, {tick_upper}]")]
    InvalidRange { tick_lower: i32, tick_upper: i32 },

    #[error("Tick {tick} not aligned to spacing {tick_spacing}")]
    TickMisaligned { tick: i32, tick_spacing: i32 },

    #[error("Position liquidity {available} below removal of {requested}")]
    InsufficientLiquidity { available: u128, requested: u128 },

    #[error("Insufficient {currency} balance for {account}: have {available}, need {required}")]
    InsufficientFunds {
        account: AccountId,
        currency: Currency,
        available: u128,
        required: u128,
    },

    #[error("Unknown currency {0}")]
    UnknownCurrency(Currency),

    #[error("Invalid price limit {0}")]
    InvalidPriceLimit(u128),

    #[error("Swap amount must be nonzero")]
    ZeroAmount,

    #[error("Pool math failed: {0}")]
    Math(#[from] doppler_math::MathError),
}

// ============================================================================
// Pool Contract
// ============================================================================

/// Operations the engine invokes on its pool
///
/// Calls are made on behalf of the engine; balances created by liquidity
/// changes are credited to or debited from the engine's account in the pool.
pub trait PoolManager {
    fn slot0(&self) -> Slot0;

    /// Add or remove liquidity; returns the caller delta (principal plus
    /// collected fees) and the fee component on its own
    fn modify_liquidity(
        &mut self,
        params: ModifyLiquidityParams,
    ) -> Result<(BalanceDelta, BalanceDelta), PoolError>;

    /// Move the price to `sqrt_price_x64` by trading against whatever
    /// liquidity is active
    fn swap_to_price(&mut self, sqrt_price_x64: u128) -> Result<BalanceDelta, PoolError>;

    /// Pay `amount` of the engine's pool balance out to `recipient`
    fn take(
        &mut self,
        currency: &Currency,
        recipient: &AccountId,
        amount: u128,
    ) -> Result<(), PoolError>;

    /// Deposit `amount` from the engine's own holdings into its pool balance
    fn settle(&mut self, currency: &Currency, amount: u128) -> Result<(), PoolError>;
}
