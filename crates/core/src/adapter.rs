//! # Pool Adapter
//!
//! Glue between slug layouts and the [`PoolManager`] contract. Every call
//! that moves tokens feeds the resulting [`BalanceDelta`] into the engine's
//! reserve ledger, so `reserves` always mirrors what the engine holds in the
//! pool outside of its positions.

use doppler_math::safe_cast_u128_to_i128;
use tracing::trace;

use crate::error::AuctionResult;
use crate::pool::{ModifyLiquidityParams, PoolManager};
use crate::position::{Position, PositionBook};
use crate::state::TokenAmounts;

/// Remove every slug with liquidity and empty the book
///
/// Principal and fees land in `reserves`; the fee component is also added to
/// `fees_accrued`.
pub fn clear_slugs<P: PoolManager>(
    pool: &mut P,
    book: &mut PositionBook,
    reserves: &mut TokenAmounts,
    fees_accrued: &mut TokenAmounts,
) -> AuctionResult<()> {
    for position in book.active() {
        let (tick_lower, tick_upper) = position.pool_ticks();
        let (delta, fees) = pool.modify_liquidity(ModifyLiquidityParams {
            tick_lower,
            tick_upper,
            liquidity_delta: -safe_cast_u128_to_i128(position.liquidity)?,
            salt: position.id,
        })?;
        trace!(
            id = position.id,
            amount0 = delta.amount0,
            amount1 = delta.amount1,
            "removed slug"
        );
        reserves.apply(delta)?;
        fees_accrued.apply(fees)?;
    }
    book.clear();
    Ok(())
}

/// Move the pool price with a swap against no engine liquidity
pub fn reposition_price<P: PoolManager>(
    pool: &mut P,
    sqrt_price_x64: u128,
    reserves: &mut TokenAmounts,
) -> AuctionResult<()> {
    let delta = pool.swap_to_price(sqrt_price_x64)?;
    reserves.apply(delta)?;
    Ok(())
}

/// Add liquidity for each non-empty slug and record every slug, placeholders
/// included, in the book
pub fn install_slugs<'a, P: PoolManager>(
    pool: &mut P,
    book: &mut PositionBook,
    slugs: impl IntoIterator<Item = &'a Position>,
    reserves: &mut TokenAmounts,
) -> AuctionResult<()> {
    for position in slugs {
        if !position.is_empty() {
            let (tick_lower, tick_upper) = position.pool_ticks();
            let (delta, _) = pool.modify_liquidity(ModifyLiquidityParams {
                tick_lower,
                tick_upper,
                liquidity_delta: safe_cast_u128_to_i128(position.liquidity)?,
                salt: position.id,
            })?;
            reserves.apply(delta)?;
        }
        book.insert(*position);
    }
    Ok(())
}
