//! # Doppler Math
//!
//! Pure fixed-point arithmetic shared by the auction engine and its tooling:
//!
//! - Tick <-> sqrt price conversions in Q64.64
//! - Spacing alignment with explicit rounding direction
//! - Concentrated-liquidity amount/liquidity conversions
//! - WAD (1e18) helpers for the auction schedule and accumulator
//!
//! Every function is side-effect free and returns a [`MathResult`] instead of
//! panicking on overflow.

pub mod big_int;
pub mod constants;
pub mod error;
pub mod fixed_point;
pub mod liquidity_math;
pub mod safe_math;
pub mod swap_math;
pub mod tick_math;

// Re-export commonly used items
pub use big_int::{mul_div, Rounding, U256};
pub use constants::*;
pub use error::{MathError, MathResult};
pub use fixed_point::*;
pub use liquidity_math::*;
pub use safe_math::*;
pub use swap_math::*;
pub use tick_math::*;
