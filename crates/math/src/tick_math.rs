//! # Tick Math
//!
//! Conversions between ticks and Q64.64 sqrt prices, plus tick-spacing
//! alignment. Prices are `1.0001^tick`; sqrt prices are computed in Q128 with
//! 256-bit intermediates and rounded up into Q64 so that the inverse search
//! is exact on tick boundaries.

use crate::big_int::{u256_to_u128, Rounding, U256};
use crate::constants::{MAX_TICK, MIN_TICK};
use crate::error::{MathError, MathResult};

/// `1 / sqrt(1.0001)^(2^i)` in Q128 for each bit of `|tick|`
const SQRT_RATIO_STEPS: [u128; 19] = [
    0xfffcb933bd6fad37aa2d162d1a594001,
    0xfff97272373d413259a46990580e213a,
    0xfff2e50f5f656932ef12357cf3c7fdcc,
    0xffe5caca7e10e4e61c3624eaa0941cd0,
    0xffcb9843d60f6159c9db58835c926644,
    0xff973b41fa98c081472e6896dfb254c0,
    0xff2ea16466c96a3843ec78b326b52861,
    0xfe5dee046a99a2a811c461f1969c3053,
    0xfcbe86c7900a88aedcffc83b479aa3a4,
    0xf987a7253ac413176f2b074cf7815e54,
    0xf3392b0822b70005940c7a398e4b70f3,
    0xe7159475a2c29b7443b29c7fa6e889d9,
    0xd097f3bdfd2022b8845ad8f792aa5825,
    0xa9f746462d870fdf8a65dc1f90e061e5,
    0x70d869a156d2a1b890bb3df62baf32f7,
    0x31be135f97d08fd981231505542fcfa6,
    0x9aa508b5b7a84e1c677de54f3e99bc9,
    0x5d6af8dedb81196699c329225ee604,
    0x2216e584f5fa1ea926041bedfe98,
];

/// Get the Q64.64 sqrt price at a tick
pub fn get_sqrt_price_at_tick(tick: i32) -> MathResult<u128> {
    if !is_tick_valid(tick) {
        return Err(MathError::TickOutOfRange(tick as i64));
    }

    let abs_tick = tick.unsigned_abs();
    let mut ratio = U256::ONE << 128u32;
    for (bit, step) in SQRT_RATIO_STEPS.iter().enumerate() {
        if abs_tick & (1u32 << bit) != 0 {
            ratio = (ratio * U256::from(*step)) >> 128u32;
        }
    }

    // The table encodes negative ticks; invert for positive ones
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128 -> Q64, rounding up
    let shifted = ratio >> 64u32;
    let remainder = ratio & U256::from(u64::MAX as u128);
    let sqrt_price = if remainder == U256::ZERO {
        shifted
    } else {
        shifted + U256::ONE
    };
    u256_to_u128(sqrt_price)
}

/// Smallest sqrt price representable on the tick domain
pub fn min_sqrt_price() -> MathResult<u128> {
    get_sqrt_price_at_tick(MIN_TICK)
}

/// Largest sqrt price representable on the tick domain
pub fn max_sqrt_price() -> MathResult<u128> {
    get_sqrt_price_at_tick(MAX_TICK)
}

/// Get the greatest tick whose sqrt price is at or below `sqrt_price`
pub fn get_tick_at_sqrt_price(sqrt_price: u128) -> MathResult<i32> {
    if sqrt_price < min_sqrt_price()? || sqrt_price > max_sqrt_price()? {
        return Err(MathError::SqrtPriceOutOfRange(sqrt_price));
    }

    let mut low = MIN_TICK;
    let mut high = MAX_TICK;
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if get_sqrt_price_at_tick(mid)? <= sqrt_price {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Check if a tick is within the supported range
pub fn is_tick_valid(tick: i32) -> bool {
    (MIN_TICK..=MAX_TICK).contains(&tick)
}

/// Snap a tick onto a multiple of `tick_spacing`
///
/// `Rounding::Down` moves toward negative infinity, `Rounding::Up` toward
/// positive infinity. Ticks already on the grid are returned unchanged.
pub fn align_tick_to_spacing(tick: i32, tick_spacing: i32, rounding: Rounding) -> MathResult<i32> {
    if tick_spacing <= 0 {
        return Err(MathError::InvalidTickSpacing(tick_spacing));
    }
    let remainder = tick.rem_euclid(tick_spacing);
    if remainder == 0 {
        return Ok(tick);
    }
    let floor = tick - remainder;
    match rounding {
        Rounding::Down => Ok(floor),
        Rounding::Up => floor
            .checked_add(tick_spacing)
            .ok_or(MathError::Overflow("align_tick_to_spacing")),
    }
}

/// Largest multiple of `tick_spacing` inside the tick domain
pub fn max_usable_tick(tick_spacing: i32) -> MathResult<i32> {
    align_tick_to_spacing(MAX_TICK, tick_spacing, Rounding::Down)
}

/// Smallest multiple of `tick_spacing` inside the tick domain
pub fn min_usable_tick(tick_spacing: i32) -> MathResult<i32> {
    align_tick_to_spacing(MIN_TICK, tick_spacing, Rounding::Up)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Q64;
    use proptest::prelude::*;

    #[test]
    fn test_tick_zero_is_unit_price() {
        assert_eq!(get_sqrt_price_at_tick(0).unwrap(), Q64);
        assert_eq!(get_tick_at_sqrt_price(Q64).unwrap(), 0);
    }

    #[test]
    fn test_sqrt_price_monotonic() {
        let mut previous = get_sqrt_price_at_tick(-1000).unwrap();
        for tick in -999..=1000 {
            let current = get_sqrt_price_at_tick(tick).unwrap();
            assert!(current > previous, "tick {tick}");
            previous = current;
        }
    }

    #[test]
    fn test_sqrt_price_near_unity() {
        // sqrt(1.0001) ~= 1.00005
        let up = get_sqrt_price_at_tick(1).unwrap();
        let down = get_sqrt_price_at_tick(-1).unwrap();
        let expected_up = Q64 + Q64 / 20_000;
        let expected_down = Q64 - Q64 / 20_000;
        assert!(up.abs_diff(expected_up) < Q64 / 100_000_000);
        assert!(down.abs_diff(expected_down) < Q64 / 100_000_000);
    }

    #[test]
    fn test_bounds() {
        assert!(get_sqrt_price_at_tick(MIN_TICK).is_ok());
        assert!(get_sqrt_price_at_tick(MAX_TICK).is_ok());
        assert_eq!(
            get_sqrt_price_at_tick(MAX_TICK + 1),
            Err(MathError::TickOutOfRange(MAX_TICK as i64 + 1))
        );
        assert!(get_sqrt_price_at_tick(MIN_TICK - 1).is_err());

        let min = min_sqrt_price().unwrap();
        assert_eq!(get_tick_at_sqrt_price(min).unwrap(), MIN_TICK);
        assert_eq!(get_tick_at_sqrt_price(max_sqrt_price().unwrap()).unwrap(), MAX_TICK);
        assert!(get_tick_at_sqrt_price(min - 1).is_err());
    }

    #[test]
    fn test_round_trip_known_ticks() {
        for tick in [MIN_TICK, -100_000, -1000, -1, 0, 1, 60, 1000, 100_000, MAX_TICK] {
            let sqrt_price = get_sqrt_price_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_price(sqrt_price).unwrap(), tick);
            // Just below a tick boundary belongs to the previous tick
            if tick > MIN_TICK {
                assert_eq!(get_tick_at_sqrt_price(sqrt_price - 1).unwrap(), tick - 1);
            }
        }
    }

    #[test]
    fn test_align_tick_to_spacing() {
        assert_eq!(align_tick_to_spacing(5, 10, Rounding::Down).unwrap(), 0);
        assert_eq!(align_tick_to_spacing(5, 10, Rounding::Up).unwrap(), 10);
        assert_eq!(align_tick_to_spacing(-5, 10, Rounding::Down).unwrap(), -10);
        assert_eq!(align_tick_to_spacing(-5, 10, Rounding::Up).unwrap(), 0);
        assert_eq!(align_tick_to_spacing(-20, 10, Rounding::Up).unwrap(), -20);
        assert_eq!(align_tick_to_spacing(7, 1, Rounding::Down).unwrap(), 7);
        assert_eq!(
            align_tick_to_spacing(7, 0, Rounding::Down),
            Err(MathError::InvalidTickSpacing(0))
        );
    }

    #[test]
    fn test_usable_ticks() {
        assert_eq!(max_usable_tick(30).unwrap(), 443_610);
        assert_eq!(min_usable_tick(30).unwrap(), -443_610);
        assert_eq!(max_usable_tick(1).unwrap(), MAX_TICK);
    }

    proptest! {
        #[test]
        fn prop_tick_round_trip(tick in MIN_TICK..=MAX_TICK) {
            let sqrt_price = get_sqrt_price_at_tick(tick).unwrap();
            prop_assert_eq!(get_tick_at_sqrt_price(sqrt_price).unwrap(), tick);
        }

        #[test]
        fn prop_alignment_is_on_grid(tick in MIN_TICK..=MAX_TICK, spacing in 1i32..=30) {
            let down = align_tick_to_spacing(tick, spacing, Rounding::Down).unwrap();
            let up = align_tick_to_spacing(tick, spacing, Rounding::Up).unwrap();
            prop_assert_eq!(down.rem_euclid(spacing), 0);
            prop_assert_eq!(up.rem_euclid(spacing), 0);
            prop_assert!(down <= tick && tick <= up);
            prop_assert!(up - down < spacing + 1);
        }
    }
}
