//! # Slug Placement
//!
//! Computes the liquidity layout for one rebalance:
//!
//! - **Lower slug** (id 1): numeraire below the reference price, sized to
//!   buy back everything sold so far
//! - **Upper slug** (id 2): asset for the rest of the current epoch's
//!   expected sales, just above the reference price
//! - **Price-discovery slugs** (id 3..): asset for future epochs, tiling the
//!   curve up to its global upper bound
//!
//! Ticks are directional (see [`Position`]). Every amount is reduced by one
//! unit before conversion to liquidity so rounding never overdraws the
//! engine's balances.

use doppler_math::{
    align_tick_to_spacing, get_amount_0_delta, get_amount_1_delta, get_liquidity_for_amount_0,
    get_liquidity_for_amount_1, get_sqrt_price_at_tick, get_tick_at_sqrt_price, max_sqrt_price,
    max_usable_tick, min_sqrt_price, min_usable_tick, price_to_sqrt_price_x64, Rounding,
};

use crate::accumulator::{align_directional, upper_slug_range, CurveBounds};
use crate::config::AuctionConfig;
use crate::constants::{LOWER_SLUG_ID, PRICE_DISCOVERY_SLUG_ID, UPPER_SLUG_ID};
use crate::error::AuctionResult;
use crate::position::Position;

/// Everything slug placement reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlugInputs {
    pub bounds: CurveBounds,
    pub reference_tick: i32,
    pub tick_spacing: i32,
    /// Asset held by the engine after clearing
    pub asset_available: u128,
    /// Numeraire held by the engine after clearing
    pub numeraire_available: u128,
    pub total_tokens_sold: u128,
    pub total_proceeds: u128,
    pub now: u64,
}

/// A full slug layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugSet {
    pub lower: Position,
    pub upper: Position,
    pub price_discovery: Vec<Position>,
}

impl SlugSet {
    /// Positions in id order
    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        [&self.lower, &self.upper]
            .into_iter()
            .chain(self.price_discovery.iter())
    }
}

/// Compute the complete slug layout for a rebalance
pub fn compute_slugs(config: &AuctionConfig, inputs: &SlugInputs) -> AuctionResult<SlugSet> {
    let lower = compute_lower_slug(config, inputs)?;
    let (upper, upper_outer_tick, asset_committed) = compute_upper_slug(config, inputs)?;
    let remaining = inputs.asset_available.saturating_sub(asset_committed);
    let price_discovery =
        compute_price_discovery_slugs(config, inputs, upper_outer_tick, remaining)?;

    Ok(SlugSet {
        lower,
        upper,
        price_discovery,
    })
}

// ============================================================================
// Lower Slug
// ============================================================================

/// Refund-capacity slug between the curve's lower bound and the reference
///
/// Falls back to a one-spacing band at the average clearing price when the
/// numeraire held cannot cover a full buy-back over the wide range.
pub fn compute_lower_slug(config: &AuctionConfig, inputs: &SlugInputs) -> AuctionResult<Position> {
    let reference = inputs.reference_tick;
    if inputs.numeraire_available == 0 {
        return Ok(Position::placeholder(reference, LOWER_SLUG_ID));
    }

    let tick_lower = inputs.bounds.tick_lower;
    let required = required_numeraire(config, tick_lower, reference, inputs.total_tokens_sold)?;

    if required > inputs.numeraire_available {
        return compute_refund_slug(
            config,
            inputs.tick_spacing,
            inputs.numeraire_available,
            inputs.total_tokens_sold,
            inputs.total_proceeds,
            reference,
            Some(reference),
        );
    }

    let liquidity = compute_liquidity(
        !config.is_token0,
        tick_lower,
        reference,
        inputs.numeraire_available,
    )?;
    Ok(collapse_if_empty(Position {
        tick_lower,
        tick_upper: reference,
        liquidity,
        id: LOWER_SLUG_ID,
    }))
}

/// Numeraire needed to buy back `total_tokens_sold` across `[tick_a, tick_b]`
fn required_numeraire(
    config: &AuctionConfig,
    tick_a: i32,
    tick_b: i32,
    total_tokens_sold: u128,
) -> AuctionResult<u128> {
    if total_tokens_sold == 0 || tick_a == tick_b {
        return Ok(0);
    }
    let sqrt_a = get_sqrt_price_at_tick(tick_a)?;
    let sqrt_b = get_sqrt_price_at_tick(tick_b)?;
    let required = if config.is_token0 {
        let liquidity = get_liquidity_for_amount_0(sqrt_a, sqrt_b, total_tokens_sold)?;
        get_amount_1_delta(sqrt_a, sqrt_b, liquidity, true)?
    } else {
        let liquidity = get_liquidity_for_amount_1(sqrt_a, sqrt_b, total_tokens_sold)?;
        get_amount_0_delta(sqrt_a, sqrt_b, liquidity, true)?
    };
    Ok(required)
}

/// One-spacing numeraire band ending at the average clearing price
///
/// The band sits entirely on the numeraire side of its `tick_upper`. When
/// `ceiling` is given the band is kept at or below it (in the selling
/// direction). Without sales or proceeds there is no price to anchor to,
/// and a placeholder at `fallback_tick` is returned.
pub fn compute_refund_slug(
    config: &AuctionConfig,
    tick_spacing: i32,
    numeraire_available: u128,
    total_tokens_sold: u128,
    total_proceeds: u128,
    fallback_tick: i32,
    ceiling: Option<i32>,
) -> AuctionResult<Position> {
    if numeraire_available == 0 || total_tokens_sold == 0 || total_proceeds == 0 {
        return Ok(Position::placeholder(fallback_tick, LOWER_SLUG_ID));
    }

    // Pool prices are token1 per token0
    let sqrt_price = if config.is_token0 {
        price_to_sqrt_price_x64(total_proceeds, total_tokens_sold)?
    } else {
        price_to_sqrt_price_x64(total_tokens_sold, total_proceeds)?
    };
    let sqrt_price = sqrt_price.clamp(min_sqrt_price()?, max_sqrt_price()?);
    let average_tick = get_tick_at_sqrt_price(sqrt_price)?;

    let mut tick_upper = align_directional(config, average_tick, tick_spacing)?;
    if let Some(ceiling) = ceiling {
        tick_upper = if config.is_token0 {
            tick_upper.min(ceiling)
        } else {
            tick_upper.max(ceiling)
        };
    }

    // Leave room for the band inside the usable domain
    let low = min_usable_tick(tick_spacing)? + tick_spacing;
    let high = max_usable_tick(tick_spacing)? - tick_spacing;
    tick_upper = tick_upper.clamp(low, high);
    let tick_lower = if config.is_token0 {
        tick_upper - tick_spacing
    } else {
        tick_upper + tick_spacing
    };

    let liquidity = compute_liquidity(!config.is_token0, tick_lower, tick_upper, numeraire_available)?;
    Ok(collapse_if_empty(Position {
        tick_lower,
        tick_upper,
        liquidity,
        id: LOWER_SLUG_ID,
    }))
}

// ============================================================================
// Upper Slug
// ============================================================================

/// Near-term supply slug; returns the slug, its nominal outer tick and the
/// asset it commits
pub fn compute_upper_slug(
    config: &AuctionConfig,
    inputs: &SlugInputs,
) -> AuctionResult<(Position, i32, u128)> {
    let reference = inputs.reference_tick;
    let range = upper_slug_range(config, inputs.tick_spacing)?;
    let outer = if config.is_token0 {
        reference
            .saturating_add(range)
            .min(max_usable_tick(inputs.tick_spacing)?)
    } else {
        reference
            .saturating_sub(range)
            .max(min_usable_tick(inputs.tick_spacing)?)
    };

    // Covers what is still due by the end of the next epoch
    let expected = config.expected_amount_sold(inputs.now, 1)?;
    let tokens = expected
        .saturating_sub(inputs.total_tokens_sold)
        .min(inputs.asset_available);

    let liquidity = if tokens > 0 {
        compute_liquidity(config.is_token0, reference, outer, tokens)?
    } else {
        0
    };
    let slug = collapse_if_empty(Position {
        tick_lower: reference,
        tick_upper: outer,
        liquidity,
        id: UPPER_SLUG_ID,
    });
    let committed = if slug.is_empty() { 0 } else { tokens };
    Ok((slug, outer, committed))
}

// ============================================================================
// Price-Discovery Slugs
// ============================================================================

/// Forward-looking bands from the upper slug's outer edge to the top of the
/// curve, one per remaining future epoch
///
/// Always returns `num_pd_slugs` positions; unused ones are placeholders.
pub fn compute_price_discovery_slugs(
    config: &AuctionConfig,
    inputs: &SlugInputs,
    start_tick: i32,
    asset_remaining: u128,
) -> AuctionResult<Vec<Position>> {
    let mut slugs: Vec<Position> = (0..config.num_pd_slugs)
        .map(|index| Position::placeholder(start_tick, PRICE_DISCOVERY_SLUG_ID + index))
        .collect();

    // Future epochs that still end inside the auction window
    let count = (1..=config.num_pd_slugs as i64)
        .filter(|&offset| {
            config.epoch_end_with_offset(inputs.now, offset)
                != config.epoch_end_with_offset(inputs.now, offset - 1)
        })
        .count();
    if count == 0 || asset_remaining == 0 {
        return Ok(slugs);
    }

    let span = inputs.bounds.tick_upper as i64 - start_tick as i64;
    let magnitude = align_tick_to_spacing(
        (span.unsigned_abs() / count as u64).min(i32::MAX as u64) as i32,
        inputs.tick_spacing,
        Rounding::Down,
    )?;
    let width = if config.is_token0 { magnitude } else { -magnitude };
    let pointed_right = if config.is_token0 { span > 0 } else { span < 0 };
    if magnitude == 0 || !pointed_right {
        return Ok(slugs);
    }

    let per_slug_cap = asset_remaining / count as u128;
    for (index, slug) in slugs.iter_mut().take(count).enumerate() {
        let offset = index as i64 + 1;
        let epoch_expected = config
            .expected_amount_sold(inputs.now, offset)?
            .saturating_sub(config.expected_amount_sold(inputs.now, offset - 1)?);
        let tokens = epoch_expected.min(per_slug_cap);

        let tick_lower = start_tick + width * index as i32;
        let tick_upper = tick_lower + width;
        let liquidity = compute_liquidity(config.is_token0, tick_lower, tick_upper, tokens)?;
        *slug = collapse_if_empty(Position {
            tick_lower,
            tick_upper,
            liquidity,
            id: slug.id,
        });
    }

    Ok(slugs)
}

// ============================================================================
// Helpers
// ============================================================================

/// Liquidity for `amount` of one token over a range, biased down by a unit
fn compute_liquidity(for_token0: bool, tick_a: i32, tick_b: i32, amount: u128) -> AuctionResult<u128> {
    if tick_a == tick_b || amount <= 1 {
        return Ok(0);
    }
    let amount = amount - 1;
    let sqrt_a = get_sqrt_price_at_tick(tick_a)?;
    let sqrt_b = get_sqrt_price_at_tick(tick_b)?;
    let liquidity = if for_token0 {
        get_liquidity_for_amount_0(sqrt_a, sqrt_b, amount)?
    } else {
        get_liquidity_for_amount_1(sqrt_a, sqrt_b, amount)?
    };
    Ok(liquidity)
}

/// Zero-liquidity slugs carry no width
fn collapse_if_empty(position: Position) -> Position {
    if position.liquidity == 0 {
        Position::placeholder(position.tick_upper, position.id)
    } else {
        position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::sample_config;
    use doppler_math::{get_amounts_for_liquidity, WAD};

    const DAY: u64 = 86_400;

    fn inputs(config: &AuctionConfig) -> SlugInputs {
        SlugInputs {
            bounds: CurveBounds {
                tick_lower: -1010,
                tick_upper: 0,
            },
            reference_tick: -1000,
            tick_spacing: 10,
            asset_available: config.num_tokens_to_sell,
            numeraire_available: 0,
            total_tokens_sold: 0,
            total_proceeds: 0,
            now: config.starting_time + DAY,
        }
    }

    fn held(position: &Position, sqrt_price: u128) -> (u128, u128) {
        let (low, high) = position.pool_ticks();
        get_amounts_for_liquidity(
            sqrt_price,
            get_sqrt_price_at_tick(low).unwrap(),
            get_sqrt_price_at_tick(high).unwrap(),
            position.liquidity,
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_lower_slug_placeholder_without_numeraire() {
        let config = sample_config();
        let slug = compute_lower_slug(&config, &inputs(&config)).unwrap();
        assert_eq!(slug, Position::placeholder(-1000, LOWER_SLUG_ID));
    }

    #[test]
    fn test_lower_slug_covers_buy_back() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        inputs.total_tokens_sold = 1_000 * WAD;
        inputs.total_proceeds = 1_000 * WAD;
        inputs.numeraire_available = 1_000 * WAD;

        let slug = compute_lower_slug(&config, &inputs).unwrap();
        assert_eq!((slug.tick_lower, slug.tick_upper), (-1010, -1000));
        assert!(slug.liquidity > 0);

        let sqrt_reference = get_sqrt_price_at_tick(-1000).unwrap();
        let (amount0, amount1) = held(&slug, sqrt_reference);
        assert_eq!(amount0, 0);
        assert!(amount1 <= inputs.numeraire_available);
    }

    #[test]
    fn test_lower_slug_falls_back_to_average_price() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        inputs.bounds.tick_lower = -5000;
        inputs.total_tokens_sold = 1_000 * WAD;
        // Sold at an average price of ~0.5 (tick ~ -6932)
        inputs.total_proceeds = 500 * WAD;
        inputs.numeraire_available = 500 * WAD;

        let slug = compute_lower_slug(&config, &inputs).unwrap();
        assert_eq!(slug.tick_upper, -6940);
        assert_eq!(slug.tick_lower, -6950);
        assert!(slug.liquidity > 0);
    }

    #[test]
    fn test_refund_slug_token1_mirrors() {
        let mut config = sample_config();
        config.is_token0 = false;
        config.starting_tick = 0;
        config.ending_tick = 10_000;

        // Asset token1 sold for token0 at 0.5 token0 each: pool price 2.0
        let slug =
            compute_refund_slug(&config, 10, 500 * WAD, 1_000 * WAD, 500 * WAD, 0, None).unwrap();
        assert_eq!(slug.tick_upper, 6940);
        assert_eq!(slug.tick_lower, 6950);

        // The band holds only token0 when the price sits at its tick_upper
        let (amount0, amount1) = held(&slug, get_sqrt_price_at_tick(6940).unwrap());
        assert!(amount0 > 0 && amount0 <= 500 * WAD);
        assert_eq!(amount1, 0);
    }

    #[test]
    fn test_refund_slug_without_sales_is_placeholder() {
        let config = sample_config();
        let slug = compute_refund_slug(&config, 10, 100, 0, 0, -30, None).unwrap();
        assert_eq!(slug, Position::placeholder(-30, LOWER_SLUG_ID));
    }

    #[test]
    fn test_upper_slug_sized_through_next_epoch() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        let per_epoch = config.num_tokens_to_sell / 10;
        inputs.total_tokens_sold = per_epoch;

        // Epoch 2: three epochs are due by the end of epoch 3, one is sold
        let (slug, outer, committed) = compute_upper_slug(&config, &inputs).unwrap();
        assert_eq!(slug.tick_lower, -1000);
        assert_eq!(outer, -900);
        assert_eq!(slug.tick_upper, -900);
        assert_eq!(committed, 2 * per_epoch);

        let (amount0, amount1) = held(&slug, get_sqrt_price_at_tick(-1000).unwrap());
        assert!(amount0 <= 2 * per_epoch && amount0 + WAD / 1_000_000 >= 2 * per_epoch);
        assert_eq!(amount1, 0);
    }

    #[test]
    fn test_upper_slug_capped_by_inventory() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        inputs.asset_available = 1_000 * WAD;

        let (slug, _, committed) = compute_upper_slug(&config, &inputs).unwrap();
        assert_eq!(committed, 1_000 * WAD);
        let (amount0, _) = held(&slug, get_sqrt_price_at_tick(-1000).unwrap());
        assert!(amount0 < 1_000 * WAD);
    }

    #[test]
    fn test_upper_slug_empty_when_ahead_of_schedule() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        inputs.total_tokens_sold = config.num_tokens_to_sell / 2;

        let (slug, outer, committed) = compute_upper_slug(&config, &inputs).unwrap();
        assert_eq!(slug, Position::placeholder(-900, UPPER_SLUG_ID));
        assert_eq!(outer, -900);
        assert_eq!(committed, 0);
    }

    #[test]
    fn test_price_discovery_tiles_to_curve_top() {
        let config = sample_config();
        let inputs = inputs(&config);
        let remaining = config.num_tokens_to_sell / 2;

        let slugs = compute_price_discovery_slugs(&config, &inputs, -900, remaining).unwrap();
        assert_eq!(slugs.len(), 5);
        // 900 ticks over 5 bands
        for (index, slug) in slugs.iter().enumerate() {
            assert_eq!(slug.id, PRICE_DISCOVERY_SLUG_ID + index as u8);
            assert_eq!(slug.tick_lower, -900 + 180 * index as i32);
            assert_eq!(slug.tick_upper, slug.tick_lower + 180);
            assert!(slug.liquidity > 0);
        }
    }

    #[test]
    fn test_price_discovery_skips_epochs_past_the_end() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        // Epoch 9 of 10: only one future epoch remains
        inputs.now = config.starting_time + 8 * DAY + 1;

        let slugs = compute_price_discovery_slugs(&config, &inputs, -900, WAD).unwrap();
        assert!(!slugs[0].is_empty());
        assert_eq!((slugs[0].tick_lower, slugs[0].tick_upper), (-900, 0));
        assert!(slugs[1..].iter().all(Position::is_empty));
    }

    #[test]
    fn test_price_discovery_without_room() {
        let config = sample_config();
        let inputs = inputs(&config);
        let slugs = compute_price_discovery_slugs(&config, &inputs, 0, WAD).unwrap();
        assert!(slugs.iter().all(|slug| slug.is_empty() && slug.tick_lower == 0));

        let slugs = compute_price_discovery_slugs(&config, &inputs, -900, 0).unwrap();
        assert!(slugs.iter().all(Position::is_empty));
    }

    #[test]
    fn test_layout_never_overdraws() {
        let config = sample_config();
        let mut inputs = inputs(&config);
        inputs.asset_available = config.num_tokens_to_sell / 7;
        inputs.numeraire_available = 3 * WAD;
        inputs.total_tokens_sold = 10 * WAD;
        inputs.total_proceeds = 3 * WAD;

        let set = compute_slugs(&config, &inputs).unwrap();
        let sqrt_reference = get_sqrt_price_at_tick(inputs.reference_tick).unwrap();
        let (mut total0, mut total1) = (0u128, 0u128);
        for slug in set.positions() {
            if slug.is_empty() {
                assert_eq!(slug.tick_lower, slug.tick_upper);
                continue;
            }
            let (amount0, amount1) = held(slug, sqrt_reference);
            total0 += amount0;
            total1 += amount1;
        }
        assert!(total0 <= inputs.asset_available);
        assert!(total1 <= inputs.numeraire_available);
    }
}
