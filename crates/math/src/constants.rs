//! # Math Constants
//!
//! Fixed-point scales and the supported tick domain.

// ============================================================================
// Fixed-Point Scales
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// WAD scale (1e18) used for schedule fractions and the tick accumulator
pub const WAD: u128 = 1_000_000_000_000_000_000;

/// Signed WAD for accumulator arithmetic
pub const I_WAD: i128 = WAD as i128;

// ============================================================================
// Tick Domain
// ============================================================================

/// Minimum tick whose Q64.64 sqrt price fits in a u128
pub const MIN_TICK: i32 = -443_636;

/// Maximum tick whose Q64.64 sqrt price fits in a u128
pub const MAX_TICK: i32 = 443_636;

// ============================================================================
// Fees
// ============================================================================

/// Fee denominator in pips (1_000_000 = 100%)
pub const MAX_SWAP_FEE: u32 = 1_000_000;
