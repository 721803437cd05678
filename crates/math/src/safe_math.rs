//! # Safe Math Operations
//!
//! Overflow-checked arithmetic used by the auction bookkeeping.

use num_traits::ToPrimitive;

use crate::error::{MathError, MathResult};

/// Macro to generate safe arithmetic functions
macro_rules! safe_arith {
    // Binary operations with checked methods
    ($fn_name:ident, $type:ty, $checked_method:ident, $error:ident) => {
        #[doc = concat!("Checked `", stringify!($checked_method), "` for `", stringify!($type), "`")]
        pub fn $fn_name(a: $type, b: $type) -> MathResult<$type> {
            a.$checked_method(b)
                .ok_or(MathError::$error(stringify!($fn_name)))
        }
    };

    // Division operations with zero check
    (div, $fn_name:ident, $type:ty) => {
        #[doc = concat!("Checked division for `", stringify!($type), "`")]
        pub fn $fn_name(a: $type, b: $type) -> MathResult<$type> {
            if b == 0 {
                return Err(MathError::DivisionByZero);
            }
            a.checked_div(b)
                .ok_or(MathError::Overflow(stringify!($fn_name)))
        }
    };
}

safe_arith!(safe_add_u128, u128, checked_add, Overflow);
safe_arith!(safe_sub_u128, u128, checked_sub, Underflow);
safe_arith!(safe_mul_u128, u128, checked_mul, Overflow);
safe_arith!(div, safe_div_u128, u128);

safe_arith!(safe_add_i128, i128, checked_add, Overflow);
safe_arith!(safe_sub_i128, i128, checked_sub, Underflow);
safe_arith!(safe_mul_i128, i128, checked_mul, Overflow);
safe_arith!(div, safe_div_i128, i128);

safe_arith!(safe_add_i32, i32, checked_add, Overflow);
safe_arith!(safe_sub_i32, i32, checked_sub, Underflow);

/// Narrow an i128 into an i32 tick-sized value
pub fn safe_cast_i128_to_i32(value: i128) -> MathResult<i32> {
    value.to_i32().ok_or(MathError::Conversion("i128 -> i32"))
}

/// Convert an unsigned amount into a signed delta
pub fn safe_cast_u128_to_i128(value: u128) -> MathResult<i128> {
    value.to_i128().ok_or(MathError::Conversion("u128 -> i128"))
}

/// Magnitude of a signed delta
pub fn abs_i128(value: i128) -> u128 {
    value.unsigned_abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_ops() {
        assert_eq!(safe_add_u128(100, 200).unwrap(), 300);
        assert!(safe_add_u128(u128::MAX, 1).is_err());

        assert_eq!(safe_sub_u128(300, 200).unwrap(), 100);
        assert_eq!(
            safe_sub_u128(100, 200),
            Err(MathError::Underflow("safe_sub_u128"))
        );

        assert_eq!(safe_div_i128(-9, 2).unwrap(), -4);
        assert_eq!(safe_div_i128(1, 0), Err(MathError::DivisionByZero));
        assert!(safe_div_i128(i128::MIN, -1).is_err());
    }

    #[test]
    fn test_narrowing() {
        assert_eq!(safe_cast_i128_to_i32(-443_636).unwrap(), -443_636);
        assert!(safe_cast_i128_to_i32(i32::MAX as i128 + 1).is_err());
        assert!(safe_cast_u128_to_i128(u128::MAX).is_err());
        assert_eq!(abs_i128(-42), 42);
    }
}
