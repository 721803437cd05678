//! Mutable auction bookkeeping

use doppler_math::safe_add_u128;
use serde::{Deserialize, Serialize};

use crate::error::{AuctionError, AuctionResult};
use crate::pool::BalanceDelta;

/// A pair of unsigned token amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenAmounts {
    pub amount0: u128,
    pub amount1: u128,
}

impl TokenAmounts {
    pub fn new(amount0: u128, amount1: u128) -> Self {
        Self { amount0, amount1 }
    }

    /// Amount of the auctioned asset
    pub fn asset(&self, is_token0: bool) -> u128 {
        if is_token0 {
            self.amount0
        } else {
            self.amount1
        }
    }

    /// Amount of the numeraire
    pub fn numeraire(&self, is_token0: bool) -> u128 {
        if is_token0 {
            self.amount1
        } else {
            self.amount0
        }
    }

    /// Add an asset amount
    pub fn credit_asset(&mut self, is_token0: bool, amount: u128) -> AuctionResult<()> {
        let slot = if is_token0 {
            &mut self.amount0
        } else {
            &mut self.amount1
        };
        *slot = safe_add_u128(*slot, amount)?;
        Ok(())
    }

    /// Apply a signed caller delta; fails rather than going negative
    pub fn apply(&mut self, delta: BalanceDelta) -> AuctionResult<()> {
        self.amount0 = apply_signed(self.amount0, delta.amount0, "token0")?;
        self.amount1 = apply_signed(self.amount1, delta.amount1, "token1")?;
        Ok(())
    }
}

fn apply_signed(balance: u128, delta: i128, label: &'static str) -> AuctionResult<u128> {
    let magnitude = delta.unsigned_abs();
    if delta >= 0 {
        return Ok(safe_add_u128(balance, magnitude)?);
    }
    balance
        .checked_sub(magnitude)
        .ok_or(AuctionError::InsufficientBalance(label))
}

/// Running totals of the auction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuctionState {
    /// Last epoch a rebalance ran in; 0 = never
    pub last_epoch: u64,
    /// Cumulative tick drift, scaled by 1e18
    pub tick_accumulator: i128,
    /// Asset sold net of buy-backs
    pub total_tokens_sold: u128,
    /// Numeraire received net of fees and buy-backs
    pub total_proceeds: u128,
    /// `total_tokens_sold` as of the last rebalance
    pub total_tokens_sold_last_epoch: u128,
    /// Fees swept from slugs on removal; informational
    pub fees_accrued: TokenAmounts,
}
