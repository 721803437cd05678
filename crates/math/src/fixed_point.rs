//! WAD fixed-point helpers, signed scaling, price conversion and fee math

use integer_sqrt::IntegerSquareRoot;

use crate::big_int::{mul_div, u256_to_u128, Rounding, U256};
use crate::constants::{MAX_SWAP_FEE, Q64, WAD};
use crate::error::{MathError, MathResult};
use crate::safe_math::safe_cast_u128_to_i128;

// ============================================================================
// WAD Arithmetic
// ============================================================================

/// `a * b / 1e18`, rounded down
pub fn wad_mul(a: u128, b: u128) -> MathResult<u128> {
    mul_div(a, b, WAD, Rounding::Down)
}

/// `a * 1e18 / b`, rounded down
pub fn wad_div(a: u128, b: u128) -> MathResult<u128> {
    mul_div(a, WAD, b, Rounding::Down)
}

/// Signed `a * b / denominator`, truncated toward zero
///
/// The product is carried in 256 bits so that accumulator-sized values
/// (ticks scaled by 1e18) can be rescaled without overflow.
pub fn mul_div_signed(a: i128, b: u128, denominator: u128) -> MathResult<i128> {
    let magnitude = mul_div(a.unsigned_abs(), b, denominator, Rounding::Down)?;
    let magnitude = safe_cast_u128_to_i128(magnitude)?;
    Ok(if a < 0 { -magnitude } else { magnitude })
}

// ============================================================================
// Price Conversion
// ============================================================================

/// Convert a `numerator / denominator` price into a Q64.64 sqrt price
///
/// Uses the full 128 fractional bits when the scaled ratio fits in a u128
/// and falls back to 64 fractional bits (result shifted by 32) otherwise.
pub fn price_to_sqrt_price_x64(numerator: u128, denominator: u128) -> MathResult<u128> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }

    let scaled = (U256::from(numerator) << 128u32) / U256::from(denominator);
    if let Ok(ratio_x128) = u256_to_u128(scaled) {
        return Ok(ratio_x128.integer_sqrt());
    }

    let ratio_x64 = mul_div(numerator, Q64, denominator, Rounding::Down)?;
    Ok(ratio_x64.integer_sqrt() << 32)
}

// ============================================================================
// Fees
// ============================================================================

/// Combined swap fee in pips: protocol fee applied first, LP fee on the rest
pub fn calculate_swap_fee(protocol_fee: u32, lp_fee: u32) -> MathResult<u32> {
    if protocol_fee > MAX_SWAP_FEE || lp_fee > MAX_SWAP_FEE {
        return Err(MathError::Overflow("swap fee"));
    }
    let protocol = protocol_fee as u64;
    let lp = lp_fee as u64;
    let combined = protocol + lp - protocol * lp / MAX_SWAP_FEE as u64;
    Ok(combined as u32)
}

/// Amount remaining after a fee in pips is removed, rounded down
pub fn amount_less_fee(amount: u128, fee_pips: u32) -> MathResult<u128> {
    let fee_pips = fee_pips.min(MAX_SWAP_FEE);
    mul_div(
        amount,
        (MAX_SWAP_FEE - fee_pips) as u128,
        MAX_SWAP_FEE as u128,
        Rounding::Down,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tick_math::{get_sqrt_price_at_tick, get_tick_at_sqrt_price};

    #[test]
    fn test_wad_helpers() {
        assert_eq!(wad_mul(3 * WAD, WAD / 2).unwrap(), 3 * WAD / 2);
        assert_eq!(wad_div(1, 3).unwrap(), WAD / 3);
        assert_eq!(wad_div(1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_mul_div_signed_truncates() {
        assert_eq!(mul_div_signed(-7, 1, 2).unwrap(), -3);
        assert_eq!(mul_div_signed(7, 1, 2).unwrap(), 3);
        // -1000 ticks in WAD over 10 epochs
        let delta = mul_div_signed(-10_000 * WAD as i128, WAD, 10 * WAD).unwrap();
        assert_eq!(delta, -1000 * WAD as i128);
    }

    #[test]
    fn test_price_to_sqrt_price() {
        assert_eq!(price_to_sqrt_price_x64(1, 1).unwrap(), Q64);
        assert_eq!(price_to_sqrt_price_x64(4, 1).unwrap(), 2 * Q64);
        assert_eq!(price_to_sqrt_price_x64(1, 4).unwrap(), Q64 / 2);

        // 1.0001^1000 lands on tick 1000 (or one below from truncation)
        let sqrt_price = price_to_sqrt_price_x64(110_516_539, 100_000_000).unwrap();
        let tick = get_tick_at_sqrt_price(sqrt_price).unwrap();
        assert!(tick == 999 || tick == 1000, "tick {tick}");
        assert!(sqrt_price <= get_sqrt_price_at_tick(1001).unwrap());

        assert_eq!(price_to_sqrt_price_x64(1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_swap_fee_composition() {
        assert_eq!(calculate_swap_fee(0, 3000).unwrap(), 3000);
        assert_eq!(calculate_swap_fee(1000, 3000).unwrap(), 3997);
        assert_eq!(calculate_swap_fee(MAX_SWAP_FEE, 3000).unwrap(), MAX_SWAP_FEE);
        assert!(calculate_swap_fee(MAX_SWAP_FEE + 1, 0).is_err());
    }

    #[test]
    fn test_amount_less_fee() {
        assert_eq!(amount_less_fee(1_000_000, 3000).unwrap(), 997_000);
        assert_eq!(amount_less_fee(999, 3000).unwrap(), 996);
        assert_eq!(amount_less_fee(10, MAX_SWAP_FEE).unwrap(), 0);
    }
}
