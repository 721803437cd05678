//! Test infrastructure for the Doppler auction: an in-memory pool that
//! implements the engine's pool contract, a host harness that drives the
//! hooks, and shared fixtures.

pub mod constants;
pub mod helpers;
pub mod market;
pub mod pool;

pub use constants::*;
pub use helpers::*;
pub use market::{pool_key, HarnessError, HarnessResult, Market};
pub use pool::{InMemoryPool, LiquidityPosition, PositionKey, SwapOutcome};
