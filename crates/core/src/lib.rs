//! # Doppler Core
//!
//! Time-boxed Dutch-auction liquidity bootstrapping. An [`Auction`] sells a
//! fixed asset supply into a concentrated-liquidity pool by re-placing its
//! liquidity ("slugs") once per epoch so that sales track a linear schedule.
//!
//! ## Modules
//!
//! - [`epoch`] - the auction clock and expected-sales schedule
//! - [`accumulator`] - per-epoch price drift and the global curve bounds
//! - [`slugs`] - lower, upper and price-discovery slug placement
//! - [`auction`] - the state machine driven by pool hooks
//! - [`pool`] / [`adapter`] - the consumed pool contract and its glue

pub mod accumulator;
pub mod adapter;
pub mod auction;
pub mod config;
pub mod constants;
pub mod epoch;
pub mod error;
pub mod events;
pub mod phase;
pub mod pool;
pub mod position;
pub mod slugs;
pub mod state;

pub use accumulator::{CurveBounds, Drift};
pub use auction::{Auction, MigrationOutcome};
pub use config::AuctionConfig;
pub use constants::*;
pub use error::{AuctionError, AuctionResult};
pub use events::AuctionEvent;
pub use phase::AuctionPhase;
pub use pool::{
    AccountId, BalanceDelta, Currency, ModifyLiquidityParams, PoolError, PoolKey, PoolManager,
    Slot0, SwapParams,
};
pub use position::{Position, PositionBook, SlugKind};
pub use slugs::{SlugInputs, SlugSet};
pub use state::{AuctionState, TokenAmounts};
