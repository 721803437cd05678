//! # Liquidity Math
//!
//! Calculations for concentrated liquidity positions, including amount0/amount1
//! deltas, liquidity from token amounts, and price movement from a trade.
//!
//! Sqrt prices are Q64.64. Range endpoints may be passed in either order.

use crate::big_int::{div_rounding, mul_div, u256_to_u128, Rounding, U256};
use crate::constants::Q64;
use crate::error::{MathError, MathResult};

fn ordered(sqrt_ratio_a_x64: u128, sqrt_ratio_b_x64: u128) -> (u128, u128) {
    if sqrt_ratio_a_x64 > sqrt_ratio_b_x64 {
        (sqrt_ratio_b_x64, sqrt_ratio_a_x64)
    } else {
        (sqrt_ratio_a_x64, sqrt_ratio_b_x64)
    }
}

fn rounding(round_up: bool) -> Rounding {
    if round_up {
        Rounding::Up
    } else {
        Rounding::Down
    }
}

// ============================================================================
// Amount Deltas
// ============================================================================

/// Token0 held by `liquidity` between two sqrt prices
///
/// `L * (1/a - 1/b)` evaluated as `L<<64 / a - L<<64 / b`, with each side
/// rounded so the result errs in the requested direction.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<u128> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if lower == 0 {
        return Err(MathError::DivisionByZero);
    }

    let numerator = U256::from(liquidity) << 64u32;
    let (at_lower, at_upper) = if round_up {
        (
            div_rounding(numerator, U256::from(lower), Rounding::Up)?,
            div_rounding(numerator, U256::from(upper), Rounding::Down)?,
        )
    } else {
        (
            div_rounding(numerator, U256::from(lower), Rounding::Down)?,
            div_rounding(numerator, U256::from(upper), Rounding::Up)?,
        )
    };

    if at_upper >= at_lower {
        return Ok(0);
    }
    u256_to_u128(at_lower - at_upper)
}

/// Token1 held by `liquidity` between two sqrt prices: `L * (b - a)`
pub fn get_amount_1_delta(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<u128> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    mul_div(liquidity, upper - lower, Q64, rounding(round_up))
}

// ============================================================================
// Liquidity From Amounts
// ============================================================================

/// Calculate liquidity for a given amount of token0
pub fn get_liquidity_for_amount_0(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u128,
) -> MathResult<u128> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if lower == upper {
        return Err(MathError::DivisionByZero);
    }

    let intermediate = (U256::from(lower) * U256::from(upper)) >> 64u32;
    let product = U256::from(amount0)
        .checked_mul(intermediate)
        .ok_or(MathError::Overflow("get_liquidity_for_amount_0"))?;
    u256_to_u128(product / U256::from(upper - lower))
}

/// Calculate liquidity for a given amount of token1
pub fn get_liquidity_for_amount_1(
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount1: u128,
) -> MathResult<u128> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);
    if lower == upper {
        return Err(MathError::DivisionByZero);
    }
    mul_div(amount1, Q64, upper - lower, Rounding::Down)
}

/// Calculate liquidity from amounts for a position at the current price
pub fn get_liquidity_for_amounts(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    amount0: u128,
    amount1: u128,
) -> MathResult<u128> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);

    if sqrt_price_x64 <= lower {
        get_liquidity_for_amount_0(lower, upper, amount0)
    } else if sqrt_price_x64 < upper {
        let liquidity0 = get_liquidity_for_amount_0(sqrt_price_x64, upper, amount0)?;
        let liquidity1 = get_liquidity_for_amount_1(lower, sqrt_price_x64, amount1)?;
        Ok(liquidity0.min(liquidity1))
    } else {
        get_liquidity_for_amount_1(lower, upper, amount1)
    }
}

/// Get amounts held by a position at the current price
pub fn get_amounts_for_liquidity(
    sqrt_price_x64: u128,
    sqrt_ratio_a_x64: u128,
    sqrt_ratio_b_x64: u128,
    liquidity: u128,
    round_up: bool,
) -> MathResult<(u128, u128)> {
    let (lower, upper) = ordered(sqrt_ratio_a_x64, sqrt_ratio_b_x64);

    if sqrt_price_x64 <= lower {
        Ok((get_amount_0_delta(lower, upper, liquidity, round_up)?, 0))
    } else if sqrt_price_x64 < upper {
        Ok((
            get_amount_0_delta(sqrt_price_x64, upper, liquidity, round_up)?,
            get_amount_1_delta(lower, sqrt_price_x64, liquidity, round_up)?,
        ))
    } else {
        Ok((0, get_amount_1_delta(lower, upper, liquidity, round_up)?))
    }
}

// ============================================================================
// Price Movement
// ============================================================================

/// Get the next sqrt price from a given amount of token0
///
/// Rounds up so that adding token0 never moves the price further than exact.
pub fn get_next_sqrt_price_from_amount_0_rounding_up(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> MathResult<u128> {
    if amount == 0 {
        return Ok(sqrt_price_x64);
    }
    if liquidity == 0 || sqrt_price_x64 == 0 {
        return Err(MathError::DivisionByZero);
    }

    let numerator = U256::from(liquidity) << 64u32;
    let price = U256::from(sqrt_price_x64);
    let product = U256::from(amount) * price;

    if add {
        if let Some(denominator) = numerator.checked_add(product) {
            if let Some(scaled) = numerator.checked_mul(price) {
                return u256_to_u128(div_rounding(scaled, denominator, Rounding::Up)?);
            }
        }
        // N / (N / s + x)
        let denominator = (numerator / price)
            .checked_add(U256::from(amount))
            .ok_or(MathError::Overflow("next_sqrt_price_from_amount_0"))?;
        u256_to_u128(div_rounding(numerator, denominator, Rounding::Up)?)
    } else {
        if numerator <= product {
            return Err(MathError::Underflow("next_sqrt_price_from_amount_0"));
        }
        let denominator = numerator - product;
        match numerator.checked_mul(price) {
            Some(scaled) => u256_to_u128(div_rounding(scaled, denominator, Rounding::Up)?),
            None => {
                let base = numerator / price;
                if base <= U256::from(amount) {
                    return Err(MathError::Underflow("next_sqrt_price_from_amount_0"));
                }
                u256_to_u128(div_rounding(numerator, base - U256::from(amount), Rounding::Up)?)
            }
        }
    }
}

/// Get the next sqrt price from a given amount of token1
///
/// Rounds down so that adding token1 never moves the price further than exact.
pub fn get_next_sqrt_price_from_amount_1_rounding_down(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount: u128,
    add: bool,
) -> MathResult<u128> {
    if liquidity == 0 {
        return Err(MathError::DivisionByZero);
    }

    if add {
        let quotient = mul_div(amount, Q64, liquidity, Rounding::Down)?;
        sqrt_price_x64
            .checked_add(quotient)
            .ok_or(MathError::Overflow("next_sqrt_price_from_amount_1"))
    } else {
        let quotient = mul_div(amount, Q64, liquidity, Rounding::Up)?;
        if sqrt_price_x64 <= quotient {
            return Err(MathError::Underflow("next_sqrt_price_from_amount_1"));
        }
        Ok(sqrt_price_x64 - quotient)
    }
}

/// Sqrt price after `amount_in` enters the pool
pub fn get_next_sqrt_price_from_input(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_in: u128,
    zero_for_one: bool,
) -> MathResult<u128> {
    if zero_for_one {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x64, liquidity, amount_in, true)
    } else {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x64, liquidity, amount_in, true)
    }
}

/// Sqrt price after `amount_out` leaves the pool
pub fn get_next_sqrt_price_from_output(
    sqrt_price_x64: u128,
    liquidity: u128,
    amount_out: u128,
    zero_for_one: bool,
) -> MathResult<u128> {
    if zero_for_one {
        get_next_sqrt_price_from_amount_1_rounding_down(sqrt_price_x64, liquidity, amount_out, false)
    } else {
        get_next_sqrt_price_from_amount_0_rounding_up(sqrt_price_x64, liquidity, amount_out, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_math::get_sqrt_price_at_tick;
    use proptest::prelude::*;

    #[test]
    fn test_amount_deltas_unit_range() {
        // Between 1.0 and 4.0 (sqrt 1 -> 2) with L = 1e18:
        // amount0 = L * (1 - 1/2) = 0.5e18, amount1 = L * (2 - 1) = 1e18
        let a = Q64;
        let b = 2 * Q64;
        let liquidity = 1_000_000_000_000_000_000u128;

        assert_eq!(get_amount_0_delta(a, b, liquidity, false).unwrap(), liquidity / 2);
        assert_eq!(get_amount_1_delta(a, b, liquidity, false).unwrap(), liquidity);
        // Argument order does not matter
        assert_eq!(get_amount_1_delta(b, a, liquidity, true).unwrap(), liquidity);
    }

    #[test]
    fn test_rounding_direction() {
        let a = get_sqrt_price_at_tick(-10).unwrap();
        let b = get_sqrt_price_at_tick(17).unwrap();
        let liquidity = 123_456_789u128;

        let down0 = get_amount_0_delta(a, b, liquidity, false).unwrap();
        let up0 = get_amount_0_delta(a, b, liquidity, true).unwrap();
        assert!(up0 >= down0 && up0 - down0 <= 2);

        let down1 = get_amount_1_delta(a, b, liquidity, false).unwrap();
        let up1 = get_amount_1_delta(a, b, liquidity, true).unwrap();
        assert!(up1 >= down1 && up1 - down1 <= 1);
    }

    #[test]
    fn test_liquidity_for_amounts_inverse() {
        let a = get_sqrt_price_at_tick(-600).unwrap();
        let b = get_sqrt_price_at_tick(600).unwrap();
        let amount = 1_000_000_000_000_000_000u128;

        let liquidity0 = get_liquidity_for_amount_0(a, b, amount).unwrap();
        let back0 = get_amount_0_delta(a, b, liquidity0, true).unwrap();
        assert!(back0 <= amount + 2);
        assert!(back0 + amount / 1_000_000_000 >= amount);

        let liquidity1 = get_liquidity_for_amount_1(a, b, amount).unwrap();
        let back1 = get_amount_1_delta(a, b, liquidity1, true).unwrap();
        assert!(back1 <= amount + 1);
        assert!(back1 + amount / 1_000_000_000 >= amount);
    }

    #[test]
    fn test_degenerate_range() {
        let a = get_sqrt_price_at_tick(100).unwrap();
        assert_eq!(get_liquidity_for_amount_0(a, a, 10), Err(MathError::DivisionByZero));
        assert_eq!(get_liquidity_for_amount_1(a, a, 10), Err(MathError::DivisionByZero));
        assert_eq!(get_amount_0_delta(a, a, 1_000, true).unwrap(), 0);
        assert_eq!(get_amount_1_delta(a, a, 1_000, true).unwrap(), 0);
    }

    #[test]
    fn test_amounts_for_liquidity_by_position() {
        let a = get_sqrt_price_at_tick(-100).unwrap();
        let b = get_sqrt_price_at_tick(100).unwrap();
        let liquidity = 10_000_000_000u128;

        let (below0, below1) = get_amounts_for_liquidity(a - 1, a, b, liquidity, false).unwrap();
        assert!(below0 > 0);
        assert_eq!(below1, 0);

        let (above0, above1) = get_amounts_for_liquidity(b, a, b, liquidity, false).unwrap();
        assert_eq!(above0, 0);
        assert!(above1 > 0);

        let (mid0, mid1) = get_amounts_for_liquidity(Q64, a, b, liquidity, false).unwrap();
        assert!(mid0 > 0 && mid0 < below0);
        assert!(mid1 > 0 && mid1 < above1);
    }

    #[test]
    fn test_next_sqrt_price_direction() {
        let price = Q64;
        let liquidity = 1_000_000_000_000u128;

        let after0 = get_next_sqrt_price_from_input(price, liquidity, 1_000_000, true).unwrap();
        assert!(after0 < price);
        let after1 = get_next_sqrt_price_from_input(price, liquidity, 1_000_000, false).unwrap();
        assert!(after1 > price);

        let out1 = get_next_sqrt_price_from_output(price, liquidity, 1_000_000, true).unwrap();
        assert!(out1 < price);
        let out0 = get_next_sqrt_price_from_output(price, liquidity, 1_000_000, false).unwrap();
        assert!(out0 > price);

        // Draining more than the range holds fails
        assert!(get_next_sqrt_price_from_output(price, liquidity, liquidity * 2, false).is_err());
        assert_eq!(get_next_sqrt_price_from_input(price, liquidity, 0, true).unwrap(), price);
    }

    proptest! {
        #[test]
        fn prop_input_is_covered(
            tick in -50_000i32..50_000,
            liquidity in 1_000_000u128..1_000_000_000_000_000_000_000u128,
            amount in 1u128..1_000_000_000_000_000u128,
            zero_for_one in any::<bool>(),
        ) {
            let price = get_sqrt_price_at_tick(tick).unwrap();
            let next = get_next_sqrt_price_from_input(price, liquidity, amount, zero_for_one).unwrap();
            // The amount required to reach `next` never exceeds what was supplied
            let required = if zero_for_one {
                get_amount_0_delta(next, price, liquidity, false).unwrap()
            } else {
                get_amount_1_delta(price, next, liquidity, false).unwrap()
            };
            prop_assert!(required <= amount);
        }
    }
}
