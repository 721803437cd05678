//! # Auction Constants
//!
//! Slot layout of the position book and pool binding limits.

// ============================================================================
// Pool Binding
// ============================================================================

/// Largest tick spacing an auction pool may use
pub const MAX_TICK_SPACING: i32 = 30;

// ============================================================================
// Slugs
// ============================================================================

/// Upper bound on the configured number of price-discovery slugs
pub const MAX_PRICE_DISCOVERY_SLUGS: u8 = 15;

/// Position id of the refund-capacity slug below the price
pub const LOWER_SLUG_ID: u8 = 1;

/// Position id of the near-term supply slug above the price
pub const UPPER_SLUG_ID: u8 = 2;

/// Position id of the first price-discovery slug
pub const PRICE_DISCOVERY_SLUG_ID: u8 = 3;

/// Number of slots in the dense position book
pub const NUM_SLUG_SLOTS: usize = 2 + MAX_PRICE_DISCOVERY_SLUGS as usize;
