//! # Doppler Simulation
//!
//! Replays scripted and randomly generated order flow against an auction on
//! the in-memory pool, reporting final totals and dumping slug layouts for
//! plotting.

pub mod config;
pub mod error;
pub mod scenario_runner;
pub mod snapshot;

pub use config::{AuctionParams, OrderConfig, PoolParams, RandomFlowConfig, ScenarioConfig, Side};
pub use error::{SimulationError, SimulationResult};
pub use scenario_runner::{OrderResult, ScenarioReport, ScenarioRunner};
pub use snapshot::{SlugSnapshot, SnapshotFrame, SnapshotRecorder};
