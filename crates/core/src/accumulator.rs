//! # Tick Accumulator
//!
//! The auction's drift model. Once per epoch, realized sales are compared to
//! the expected schedule and the accumulator (ticks scaled by 1e18) moves
//! the curve: a shortfall marks the price down toward the ending tick, while
//! outperformance follows the observed price up, never past the top of the
//! curve at `starting_tick ± gamma`.
//!
//! Everything here is a pure function of config, state, pool tick and time.

use doppler_math::{
    align_tick_to_spacing, mul_div_signed, safe_add_i128, safe_cast_i128_to_i32, safe_mul_i128,
    wad_div, Rounding, I_WAD, MAX_TICK, MIN_TICK, WAD,
};

use crate::config::AuctionConfig;
use crate::error::{AuctionError, AuctionResult};
use crate::state::AuctionState;

/// Global curve bounds; `tick_upper` is the top of the curve in the
/// auction's selling direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveBounds {
    pub tick_lower: i32,
    pub tick_upper: i32,
}

/// Outcome of applying a drift to the curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Drift {
    /// Accumulator after capping
    pub accumulator: i128,
    /// Change actually applied to the stored accumulator
    pub applied_delta: i128,
    pub bounds: CurveBounds,
    /// Tick the pool price is moved to before slugs are placed
    pub reference_tick: i32,
}

// ============================================================================
// Schedule Parameters
// ============================================================================

/// Align a tick in the asset-favorable direction: down when selling token0,
/// up when selling token1
pub fn align_directional(config: &AuctionConfig, tick: i32, tick_spacing: i32) -> AuctionResult<i32> {
    let rounding = if config.is_token0 {
        Rounding::Down
    } else {
        Rounding::Up
    };
    Ok(align_tick_to_spacing(tick, tick_spacing, rounding)?)
}

/// Full markdown applied for one empty epoch, scaled by 1e18
///
/// Measured from whichever of the starting tick and the current tick lies
/// further from the ending tick.
pub fn max_tick_delta_per_epoch(config: &AuctionConfig, current_tick: i32) -> AuctionResult<i128> {
    let effective_starting_tick = if config.is_token0 {
        config.starting_tick.max(current_tick)
    } else {
        config.starting_tick.min(current_tick)
    };
    let span = config.ending_tick as i128 - effective_starting_tick as i128;
    let scaled = safe_mul_i128(span, I_WAD)?;
    Ok(scaled / config.num_epochs().max(1) as i128)
}

/// Width of the upper slug: one epoch's share of gamma, aligned, at least
/// one tick spacing
pub fn upper_slug_range(config: &AuctionConfig, tick_spacing: i32) -> AuctionResult<i32> {
    let computed = config.gamma_share() * config.gamma.max(0) as u128 / WAD;
    let computed = safe_cast_i128_to_i32(computed as i128)?;
    let aligned = align_tick_to_spacing(computed, tick_spacing, Rounding::Down)?;
    Ok(aligned.max(tick_spacing))
}

/// Whole ticks represented by an accumulator value, range-checked
pub fn accumulator_ticks(accumulator: i128) -> AuctionResult<i32> {
    let ticks = accumulator / I_WAD;
    let span = (MAX_TICK as i128) - (MIN_TICK as i128);
    if ticks.abs() > span {
        return Err(AuctionError::AccumulatorOutOfRange(accumulator));
    }
    Ok(safe_cast_i128_to_i32(ticks)?)
}

// ============================================================================
// Drift
// ============================================================================

/// Accumulator change for a rebalance at `now`
///
/// Judges every epoch from the last rebalanced one up to (not including)
/// the current one. The first judged epoch holds the trades since the last
/// rebalance; the rest are empty by construction.
pub fn accumulator_delta(
    config: &AuctionConfig,
    state: &AuctionState,
    tick_spacing: i32,
    current_tick: i32,
    now: u64,
) -> AuctionResult<i128> {
    let current_epoch = config.current_epoch(now);
    let first_judged = state.last_epoch.max(1);
    if current_epoch <= first_judged {
        return Ok(0);
    }

    let max_delta = max_tick_delta_per_epoch(config, current_tick)?;
    let sold = state.total_tokens_sold;
    let offset = |epoch: u64| epoch as i64 - current_epoch as i64;

    let threshold = config.expected_amount_sold(now, offset(first_judged))?;
    let mut delta = if sold <= state.total_tokens_sold_last_epoch || threshold == 0 {
        max_delta
    } else if sold <= threshold {
        let shortfall = WAD - wad_div(sold, threshold)?;
        mul_div_signed(max_delta, shortfall, WAD)?
    } else {
        price_movement_delta(config, state, tick_spacing, current_tick)?
    };

    for epoch in (first_judged + 1)..current_epoch {
        if sold < config.expected_amount_sold(now, offset(epoch))? {
            delta = safe_add_i128(delta, max_delta)?;
        }
    }

    Ok(delta)
}

/// Drift that follows the observed price when sales beat the schedule
fn price_movement_delta(
    config: &AuctionConfig,
    state: &AuctionState,
    tick_spacing: i32,
    current_tick: i32,
) -> AuctionResult<i128> {
    let tau_tick = config.starting_tick as i64 + accumulator_ticks(state.tick_accumulator)? as i64;
    let range = upper_slug_range(config, tick_spacing)? as i64;
    let top = config.starting_tick as i64;
    let (expected_tick, bounded_tick) = if config.is_token0 {
        (tau_tick + range, (current_tick as i64).min(top + config.gamma as i64))
    } else {
        (tau_tick - range, (current_tick as i64).max(top - config.gamma as i64))
    };
    safe_mul_i128((bounded_tick - expected_tick) as i128, I_WAD).map_err(Into::into)
}

/// Clamp the accumulator so the top of the curve never passes
/// `starting_tick ± gamma`
pub fn cap_accumulator(config: &AuctionConfig, accumulator: i128) -> i128 {
    if config.is_token0 {
        accumulator.min(0)
    } else {
        accumulator.max(0)
    }
}

// ============================================================================
// Curve Placement
// ============================================================================

/// Global curve bounds for an accumulator value
pub fn global_bounds(
    config: &AuctionConfig,
    accumulator: i128,
    tick_spacing: i32,
) -> AuctionResult<CurveBounds> {
    let shifted = config.starting_tick as i64 + accumulator_ticks(accumulator)? as i64;
    let shifted = safe_cast_i128_to_i32(shifted as i128)?;
    let tick_lower = align_directional(config, shifted, tick_spacing)?;
    let tick_upper = if config.is_token0 {
        tick_lower as i64 + config.gamma as i64
    } else {
        tick_lower as i64 - config.gamma as i64
    };

    let in_domain = |tick: i64| (MIN_TICK as i64..=MAX_TICK as i64).contains(&tick);
    if !in_domain(tick_lower as i64) || !in_domain(tick_upper) {
        return Err(AuctionError::AccumulatorOutOfRange(accumulator));
    }

    Ok(CurveBounds {
        tick_lower,
        tick_upper: tick_upper as i32,
    })
}

/// Apply `raw_delta` to `accumulator` and place the curve around the
/// resulting reference tick
///
/// The reference tick is the current tick shifted by the applied delta,
/// aligned and bounded into the curve. When it lands on the curve's lower
/// bound the bound moves one spacing outward so the lower slug keeps width.
pub fn settle_curve(
    config: &AuctionConfig,
    accumulator: i128,
    raw_delta: i128,
    tick_spacing: i32,
    current_tick: i32,
) -> AuctionResult<Drift> {
    let uncapped = safe_add_i128(accumulator, raw_delta)?;
    let new_accumulator = cap_accumulator(config, uncapped);
    let applied_delta = new_accumulator - accumulator;
    let mut bounds = global_bounds(config, new_accumulator, tick_spacing)?;

    let shifted = current_tick as i64 + accumulator_ticks(applied_delta)? as i64;
    let shifted = shifted.clamp(MIN_TICK as i64, MAX_TICK as i64) as i32;
    let aligned = align_directional(config, shifted, tick_spacing)?;
    let (low, high) = (
        bounds.tick_lower.min(bounds.tick_upper),
        bounds.tick_lower.max(bounds.tick_upper),
    );
    let reference_tick = aligned.clamp(low, high);

    if reference_tick == bounds.tick_lower {
        let pushed = if config.is_token0 {
            bounds.tick_lower.checked_sub(tick_spacing)
        } else {
            bounds.tick_lower.checked_add(tick_spacing)
        };
        bounds.tick_lower = pushed
            .filter(|tick| (MIN_TICK..=MAX_TICK).contains(tick))
            .ok_or(AuctionError::AccumulatorOutOfRange(new_accumulator))?;
    }

    Ok(Drift {
        accumulator: new_accumulator,
        applied_delta,
        bounds,
        reference_tick,
    })
}
