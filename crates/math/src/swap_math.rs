//! # Swap Math
//!
//! A single step of a concentrated-liquidity swap: how far the price moves
//! within one liquidity range, and the amounts and fee that step consumes.

use crate::big_int::{mul_div, Rounding};
use crate::constants::MAX_SWAP_FEE;
use crate::error::{MathError, MathResult};
use crate::liquidity_math::{
    get_amount_0_delta, get_amount_1_delta, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};

/// Outcome of one swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapStep {
    /// Sqrt price reached by the step
    pub sqrt_price_next_x64: u128,
    /// Input consumed, excluding the fee
    pub amount_in: u128,
    /// Output released
    pub amount_out: u128,
    /// Fee charged on the input
    pub fee_amount: u128,
}

/// Compute a swap step toward `sqrt_price_target_x64`
///
/// Direction is implied by the target: a target at or below the current
/// price sells token0. `amount_remaining` is gross input for exact-input
/// swaps and desired output otherwise.
pub fn compute_swap_step(
    sqrt_price_current_x64: u128,
    sqrt_price_target_x64: u128,
    liquidity: u128,
    amount_remaining: u128,
    exact_input: bool,
    fee_pips: u32,
) -> MathResult<SwapStep> {
    if fee_pips > MAX_SWAP_FEE || (!exact_input && fee_pips == MAX_SWAP_FEE) {
        return Err(MathError::Overflow("swap fee"));
    }

    let zero_for_one = sqrt_price_current_x64 >= sqrt_price_target_x64;
    let fee = fee_pips as u128;
    let fee_complement = (MAX_SWAP_FEE - fee_pips) as u128;
    let max_fee = MAX_SWAP_FEE as u128;

    let amount_in_to = |next: u128, round_up: bool| {
        if zero_for_one {
            get_amount_0_delta(next, sqrt_price_current_x64, liquidity, round_up)
        } else {
            get_amount_1_delta(sqrt_price_current_x64, next, liquidity, round_up)
        }
    };
    let amount_out_to = |next: u128| {
        if zero_for_one {
            get_amount_1_delta(next, sqrt_price_current_x64, liquidity, false)
        } else {
            get_amount_0_delta(sqrt_price_current_x64, next, liquidity, false)
        }
    };

    if exact_input {
        let remaining_less_fee = mul_div(amount_remaining, fee_complement, max_fee, Rounding::Down)?;
        let amount_in_full = amount_in_to(sqrt_price_target_x64, true)?;

        if remaining_less_fee >= amount_in_full {
            let fee_amount = if fee_complement == 0 {
                amount_remaining - amount_in_full
            } else {
                mul_div(amount_in_full, fee, fee_complement, Rounding::Up)?
            };
            return Ok(SwapStep {
                sqrt_price_next_x64: sqrt_price_target_x64,
                amount_in: amount_in_full,
                amount_out: amount_out_to(sqrt_price_target_x64)?,
                fee_amount,
            });
        }

        let next = get_next_sqrt_price_from_input(
            sqrt_price_current_x64,
            liquidity,
            remaining_less_fee,
            zero_for_one,
        )?;
        // The remainder of the input is taken as fee
        Ok(SwapStep {
            sqrt_price_next_x64: next,
            amount_in: remaining_less_fee,
            amount_out: amount_out_to(next)?,
            fee_amount: amount_remaining - remaining_less_fee,
        })
    } else {
        let amount_out_full = amount_out_to(sqrt_price_target_x64)?;
        let (next, amount_out) = if amount_remaining >= amount_out_full {
            (sqrt_price_target_x64, amount_out_full)
        } else {
            let next = get_next_sqrt_price_from_output(
                sqrt_price_current_x64,
                liquidity,
                amount_remaining,
                zero_for_one,
            )?;
            (next, amount_out_to(next)?.min(amount_remaining))
        };
        let amount_in = amount_in_to(next, true)?;
        Ok(SwapStep {
            sqrt_price_next_x64: next,
            amount_in,
            amount_out,
            fee_amount: mul_div(amount_in, fee, fee_complement, Rounding::Up)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::Q64;
    use crate::tick_math::get_sqrt_price_at_tick;

    const LIQUIDITY: u128 = 1_000_000_000_000_000_000;

    #[test]
    fn test_exact_input_reaches_target() {
        let target = get_sqrt_price_at_tick(-10).unwrap();
        let step = compute_swap_step(Q64, target, LIQUIDITY, u128::MAX / 4, true, 3000).unwrap();
        assert_eq!(step.sqrt_price_next_x64, target);
        assert!(step.amount_in > 0 && step.amount_out > 0);
        // 0.3% fee grossed up on the input
        assert_eq!(step.fee_amount, mul_div(step.amount_in, 3000, 997_000, Rounding::Up).unwrap());
    }

    #[test]
    fn test_exact_input_partial() {
        let target = get_sqrt_price_at_tick(1000).unwrap();
        let step = compute_swap_step(Q64, target, LIQUIDITY, 1_000_000, true, 3000).unwrap();
        assert!(step.sqrt_price_next_x64 > Q64 && step.sqrt_price_next_x64 < target);
        assert_eq!(step.amount_in + step.fee_amount, 1_000_000);
        assert_eq!(step.fee_amount, 3000);
        assert!(step.amount_out < 1_000_000);
    }

    #[test]
    fn test_exact_output_partial() {
        let target = get_sqrt_price_at_tick(-1000).unwrap();
        let step = compute_swap_step(Q64, target, LIQUIDITY, 500_000, false, 0).unwrap();
        assert!(step.sqrt_price_next_x64 < Q64 && step.sqrt_price_next_x64 > target);
        assert_eq!(step.amount_out, 500_000);
        assert!(step.amount_in >= 500_000);
        assert_eq!(step.fee_amount, 0);
    }

    #[test]
    fn test_invalid_fee() {
        assert!(compute_swap_step(Q64, Q64 + 1, LIQUIDITY, 10, true, MAX_SWAP_FEE + 1).is_err());
        assert!(compute_swap_step(Q64, Q64 + 1, LIQUIDITY, 10, false, MAX_SWAP_FEE).is_err());
    }
}
