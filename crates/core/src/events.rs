//! Notifications recorded by the engine for hosts and indexers.
//! The engine appends to an in-memory log that the host drains after each
//! call; nothing is emitted for a rejected call.

use serde::{Deserialize, Serialize};

use crate::pool::AccountId;

// ============================================================================
// Event Definitions
// ============================================================================

/// Engine notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuctionEvent {
    /// Bound to a pool and placed the first slug set
    Initialized {
        timestamp: u64,
        epoch: u64,
        tick: i32,
    },

    /// Epoch rebalance completed
    Rebalanced {
        timestamp: u64,
        epoch: u64,
        tick_accumulator: i128,
        tick_lower: i32,
        tick_upper: i32,
        reference_tick: i32,
    },

    /// Matured below the minimum; refund mode entered
    InsufficientProceeds {
        timestamp: u64,
        total_proceeds: u128,
        minimum_proceeds: u128,
    },

    /// Proceeds reached the maximum
    EarlyExit {
        timestamp: u64,
        epoch: u64,
        total_proceeds: u128,
    },

    /// Balances released to the migration recipient
    Migrated {
        timestamp: u64,
        recipient: AccountId,
        sqrt_price_x64: u128,
        balance0: u128,
        balance1: u128,
    },
}

impl AuctionEvent {
    pub fn timestamp(&self) -> u64 {
        match self {
            AuctionEvent::Initialized { timestamp, .. }
            | AuctionEvent::Rebalanced { timestamp, .. }
            | AuctionEvent::InsufficientProceeds { timestamp, .. }
            | AuctionEvent::EarlyExit { timestamp, .. }
            | AuctionEvent::Migrated { timestamp, .. } => *timestamp,
        }
    }

    /// Short label for logs
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::Initialized { .. } => "Initialized",
            AuctionEvent::Rebalanced { .. } => "Rebalanced",
            AuctionEvent::InsufficientProceeds { .. } => "InsufficientProceeds",
            AuctionEvent::EarlyExit { .. } => "EarlyExit",
            AuctionEvent::Migrated { .. } => "Migrated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let event = AuctionEvent::EarlyExit {
            timestamp: 42,
            epoch: 3,
            total_proceeds: 10,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "EarlyExit");
        assert_eq!(json["epoch"], 3);
        assert_eq!(event.timestamp(), 42);
        assert_eq!(event.name(), "EarlyExit");
    }
}
