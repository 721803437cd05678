//! Big integer helpers for high-precision math
//!
//! Intermediate products are carried in 256 bits (`ethnum::U256`) so that
//! `a * b / c` over u128 operands never loses the high word.

use crate::error::{MathError, MathResult};

pub use ethnum::U256;

/// Rounding mode for division operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Round down (towards zero)
    Down,
    /// Round up (away from zero)
    Up,
}

/// Narrow a U256 back into a u128
pub fn u256_to_u128(value: U256) -> MathResult<u128> {
    let (hi, lo) = value.into_words();
    if hi != 0 {
        return Err(MathError::Overflow("u256 narrowing"));
    }
    Ok(lo)
}

/// Divide two U256 values with the requested rounding
pub fn div_rounding(numerator: U256, denominator: U256, rounding: Rounding) -> MathResult<U256> {
    if denominator == U256::ZERO {
        return Err(MathError::DivisionByZero);
    }
    let quotient = numerator / denominator;
    if rounding == Rounding::Up && numerator % denominator != U256::ZERO {
        return quotient
            .checked_add(U256::ONE)
            .ok_or(MathError::Overflow("div_rounding"));
    }
    Ok(quotient)
}

/// Multiply two values and divide by a third with specified rounding
/// result = (a * b) / denominator
///
/// The product of two u128 values always fits in 256 bits, so only the
/// final narrowing can fail.
pub fn mul_div(a: u128, b: u128, denominator: u128, rounding: Rounding) -> MathResult<u128> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a) * U256::from(b);
    let quotient = div_rounding(product, U256::from(denominator), rounding)?;
    u256_to_u128(quotient)
}

/// Like [`mul_div`] but over U256 operands, failing if the product overflows
pub fn mul_div_u256(a: U256, b: U256, denominator: U256, rounding: Rounding) -> MathResult<U256> {
    let product = a.checked_mul(b).ok_or(MathError::Overflow("mul_div_u256"))?;
    div_rounding(product, denominator, rounding)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_rounding() {
        // 10 * 3 / 4 = 7.5
        assert_eq!(mul_div(10, 3, 4, Rounding::Down).unwrap(), 7);
        assert_eq!(mul_div(10, 3, 4, Rounding::Up).unwrap(), 8);

        // Exact division is not bumped
        assert_eq!(mul_div(10, 4, 5, Rounding::Up).unwrap(), 8);
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        let a = u128::MAX / 2;
        assert_eq!(mul_div(a, 4, 4, Rounding::Down).unwrap(), a);
        assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX, Rounding::Down).unwrap(), u128::MAX);
    }

    #[test]
    fn test_mul_div_errors() {
        assert_eq!(mul_div(1, 1, 0, Rounding::Down), Err(MathError::DivisionByZero));
        assert!(matches!(
            mul_div(u128::MAX, 2, 1, Rounding::Down),
            Err(MathError::Overflow(_))
        ));
    }

    #[test]
    fn test_mul_div_u256_overflow() {
        let big = U256::ONE << 200u32;
        assert!(mul_div_u256(big, big, U256::ONE, Rounding::Down).is_err());
        assert_eq!(
            mul_div_u256(U256::from(6u128), U256::from(7u128), U256::from(4u128), Rounding::Up).unwrap(),
            U256::from(11u128)
        );
    }
}
