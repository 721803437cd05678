//! # Epoch Clock
//!
//! Pure functions mapping wall-clock time onto the auction schedule.
//! Epochs are 1-indexed; any time before the start is epoch 1.

use doppler_math::{mul_div, MathResult, Rounding, WAD};

use crate::config::AuctionConfig;

impl AuctionConfig {
    pub fn num_epochs(&self) -> u64 {
        self.duration() / self.epoch_length.max(1)
    }

    /// Epoch containing `now`
    pub fn current_epoch(&self, now: u64) -> u64 {
        if now < self.starting_time {
            return 1;
        }
        (now - self.starting_time) / self.epoch_length.max(1) + 1
    }

    /// End timestamp of the epoch `offset` steps from the one containing
    /// `now`, clamped to the auction window
    pub fn epoch_end_with_offset(&self, now: u64, offset: i64) -> u64 {
        let epoch = self.current_epoch(now) as i128 + offset as i128;
        if epoch <= 0 {
            return self.starting_time;
        }
        let end = self.starting_time as i128 + epoch * self.epoch_length as i128;
        end.min(self.ending_time as i128) as u64
    }

    /// Fraction of the auction elapsed at `timestamp`, in WAD
    pub fn normalized_time_elapsed(&self, timestamp: u64) -> u128 {
        let clamped = timestamp.clamp(self.starting_time, self.ending_time);
        let elapsed = (clamped - self.starting_time) as u128;
        elapsed * WAD / self.duration().max(1) as u128
    }

    /// Cumulative sales expected by the end of the epoch `offset` steps away
    pub fn expected_amount_sold(&self, now: u64, offset: i64) -> MathResult<u128> {
        let end = self.epoch_end_with_offset(now, offset);
        mul_div(
            self.normalized_time_elapsed(end),
            self.num_tokens_to_sell,
            WAD,
            Rounding::Down,
        )
    }

    /// Cumulative sales expected by the end of `epoch`
    pub fn expected_amount_sold_by_epoch_end(&self, epoch: u64) -> MathResult<u128> {
        let end = self
            .starting_time
            .saturating_add(epoch.saturating_mul(self.epoch_length))
            .min(self.ending_time);
        mul_div(
            self.normalized_time_elapsed(end),
            self.num_tokens_to_sell,
            WAD,
            Rounding::Down,
        )
    }

    /// One epoch's share of the auction duration, in WAD
    pub fn gamma_share(&self) -> u128 {
        self.epoch_length as u128 * WAD / self.duration().max(1) as u128
    }
}
