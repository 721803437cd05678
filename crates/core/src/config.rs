//! # Auction Configuration
//!
//! Immutable parameters fixed at creation. [`AuctionConfig::validate`] is
//! the only place configuration errors are raised; an invalid config never
//! produces an auction.

use doppler_math::{is_tick_valid, MAX_SWAP_FEE, WAD};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_PRICE_DISCOVERY_SLUGS;
use crate::error::{AuctionError, AuctionResult};
use crate::pool::AccountId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Asset inventory to sell
    pub num_tokens_to_sell: u128,
    /// Proceeds below which the auction refunds at maturity
    pub minimum_proceeds: u128,
    /// Proceeds at which the auction exits early
    pub maximum_proceeds: u128,
    pub starting_time: u64,
    pub ending_time: u64,
    pub starting_tick: i32,
    pub ending_tick: i32,
    /// Seconds per epoch; must divide the auction duration
    pub epoch_length: u64,
    /// Maximum tick drift across the whole auction
    pub gamma: i32,
    /// Asset is the low-address token of the pool
    pub is_token0: bool,
    pub num_pd_slugs: u8,
    /// Fee override returned on every trade, in pips
    pub lp_fee: u32,
    /// Only account allowed to migrate
    pub migrator: AccountId,
}

impl AuctionConfig {
    /// Validate configuration
    pub fn validate(&self) -> AuctionResult<()> {
        if self.num_tokens_to_sell == 0 {
            return Err(AuctionError::ZeroTokensToSell);
        }

        if self.ending_time <= self.starting_time {
            return Err(AuctionError::InvalidTimeRange {
                starting_time: self.starting_time,
                ending_time: self.ending_time,
            });
        }

        if self.epoch_length == 0 || self.duration() % self.epoch_length != 0 {
            return Err(AuctionError::InvalidEpochLength(self.epoch_length));
        }

        if self.minimum_proceeds > self.maximum_proceeds {
            return Err(AuctionError::InvalidProceedsBounds {
                minimum: self.minimum_proceeds,
                maximum: self.maximum_proceeds,
            });
        }

        let ordered = if self.is_token0 {
            self.starting_tick > self.ending_tick
        } else {
            self.starting_tick < self.ending_tick
        };
        if !ordered || !is_tick_valid(self.starting_tick) || !is_tick_valid(self.ending_tick) {
            return Err(AuctionError::InvalidTickRange {
                starting_tick: self.starting_tick,
                ending_tick: self.ending_tick,
            });
        }

        // The top of the curve must stay inside the tick domain
        let curve_top = if self.is_token0 {
            self.starting_tick.checked_add(self.gamma)
        } else {
            self.starting_tick.checked_sub(self.gamma)
        };
        if self.gamma <= 0 || !curve_top.is_some_and(is_tick_valid) {
            return Err(AuctionError::InvalidGamma(self.gamma));
        }

        // Per-epoch share of gamma must survive fixed-point scaling
        let per_epoch = self.gamma_share() * self.gamma as u128 / WAD;
        if per_epoch == 0 {
            return Err(AuctionError::InvalidGamma(self.gamma));
        }

        if self.num_pd_slugs == 0 || self.num_pd_slugs > MAX_PRICE_DISCOVERY_SLUGS {
            return Err(AuctionError::InvalidNumPdSlugs(self.num_pd_slugs));
        }

        if self.lp_fee > MAX_SWAP_FEE {
            return Err(AuctionError::InvalidLpFee(self.lp_fee));
        }

        let num_epochs = self.num_epochs();
        let tick_span = (self.ending_tick as i64 - self.starting_tick as i64).unsigned_abs();
        if tick_span / num_epochs == 0 {
            return Err(AuctionError::TickDeltaTooSmall { num_epochs });
        }

        Ok(())
    }

    /// Auction duration in seconds
    pub fn duration(&self) -> u64 {
        self.ending_time.saturating_sub(self.starting_time)
    }
}
