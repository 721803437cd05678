//! Slug positions and the dense book that stores them

use serde::{Deserialize, Serialize};

use crate::constants::{LOWER_SLUG_ID, NUM_SLUG_SLOTS, PRICE_DISCOVERY_SLUG_ID, UPPER_SLUG_ID};

/// A liquidity range owned by the engine
///
/// Ticks are directional: `tick_lower` is the edge nearer the curve's lower
/// bound, which is numerically greater in token1 auctions. A zero-liquidity
/// slug always has `tick_lower == tick_upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    pub id: u8,
}

impl Position {
    /// Zero-liquidity marker pinned at `tick`
    pub fn placeholder(tick: i32, id: u8) -> Self {
        Self {
            tick_lower: tick,
            tick_upper: tick,
            liquidity: 0,
            id,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0
    }

    /// Ticks in numeric order, as the pool expects them
    pub fn pool_ticks(&self) -> (i32, i32) {
        (
            self.tick_lower.min(self.tick_upper),
            self.tick_lower.max(self.tick_upper),
        )
    }

    pub fn kind(&self) -> SlugKind {
        SlugKind::from_id(self.id)
    }
}

/// Role of a slug, derived from its id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugKind {
    Lower,
    Upper,
    PriceDiscovery(u8),
}

impl SlugKind {
    pub fn from_id(id: u8) -> Self {
        match id {
            LOWER_SLUG_ID => SlugKind::Lower,
            UPPER_SLUG_ID => SlugKind::Upper,
            other => SlugKind::PriceDiscovery(other.saturating_sub(PRICE_DISCOVERY_SLUG_ID)),
        }
    }

    /// Label used in slug snapshots
    pub fn name(&self) -> String {
        match self {
            SlugKind::Lower => "lowerSlug".to_string(),
            SlugKind::Upper => "upperSlug".to_string(),
            SlugKind::PriceDiscovery(index) => format!("pdSlug{}", index + 1),
        }
    }
}

/// Positions keyed by slug id `1..=NUM_SLUG_SLOTS`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionBook {
    slots: [Position; NUM_SLUG_SLOTS],
}

impl PositionBook {
    pub fn get(&self, id: u8) -> Option<&Position> {
        let index = (id as usize).checked_sub(1)?;
        self.slots.get(index)
    }

    pub fn lower(&self) -> Position {
        self.get(LOWER_SLUG_ID).copied().unwrap_or_default()
    }

    pub fn upper(&self) -> Position {
        self.get(UPPER_SLUG_ID).copied().unwrap_or_default()
    }

    /// Store `position` under its id; ids outside the book are ignored
    pub fn insert(&mut self, position: Position) {
        if let Some(index) = (position.id as usize).checked_sub(1) {
            if let Some(slot) = self.slots.get_mut(index) {
                *slot = position;
            }
        }
    }

    /// Slots that hold liquidity
    pub fn active(&self) -> impl Iterator<Item = &Position> {
        self.slots.iter().filter(|position| !position.is_empty())
    }

    /// Every slot that has been written
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.slots.iter().filter(|position| position.id != 0)
    }

    pub fn clear(&mut self) {
        self.slots = [Position::default(); NUM_SLUG_SLOTS];
    }
}
